use serde::{Deserialize, Serialize};

/// A guarded action, named the way it appears in audit logs and error messages.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "bill.review")]
    ReviewBill,
    #[serde(rename = "bill.delete")]
    DeleteBill,
    #[serde(rename = "bill.clear")]
    ClearBills,
    #[serde(rename = "user.list")]
    ListUsers,
    #[serde(rename = "user.add")]
    AddUser,
    #[serde(rename = "user.update")]
    UpdateUser,
    #[serde(rename = "user.delete")]
    DeleteUser,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ReviewBill => "bill.review",
            Action::DeleteBill => "bill.delete",
            Action::ClearBills => "bill.clear",
            Action::ListUsers => "user.list",
            Action::AddUser => "user.add",
            Action::UpdateUser => "user.update",
            Action::DeleteUser => "user.delete",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
