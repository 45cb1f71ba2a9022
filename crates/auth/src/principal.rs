use serde::{Deserialize, Serialize};

use budget_eagle_core::UserId;

use crate::Role;

/// The authenticated actor performing an action.
///
/// `name` and `department` are what gets snapshotted onto a bill at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub department: String,
}

impl Principal {
    pub fn new(
        id: UserId,
        email: impl Into<String>,
        name: impl Into<String>,
        role: Role,
        department: impl Into<String>,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            name: name.into(),
            role,
            department: department.into(),
        }
    }
}
