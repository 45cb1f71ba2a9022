//! User directory records.
//!
//! A `User` is the profile behind a principal. Role and email are bound at
//! creation; later edits may only touch display fields.

use serde::{Deserialize, Serialize};

use budget_eagle_core::{DomainError, DomainResult, UserId};

use crate::{Principal, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Stored normalized (trimmed, lowercase).
    pub email: String,
    pub role: Role,
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Input for creating a user. The id is assigned by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Partial update. `role` and `email` are accepted on the wire only so that a
/// change attempt can be refused explicitly instead of being dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub email: Option<String>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> DomainResult<String> {
    let email = normalize_email(email);
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(DomainError::validation("invalid email format")),
    }
}

fn required(field: &str, value: &str) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(value.to_string())
}

impl NewUser {
    /// Validate and build the stored record under a fresh id.
    pub fn into_user(self, id: UserId) -> DomainResult<User> {
        Ok(User {
            id,
            name: required("name", &self.name)?,
            email: validate_email(&self.email)?,
            role: self.role,
            department: required("department", &self.department)?,
            avatar: self.avatar,
        })
    }
}

impl User {
    pub fn has_email(&self, email: &str) -> bool {
        self.email == normalize_email(email)
    }

    /// Apply a patch in place. Changing role or email is refused; resending the
    /// current value is accepted as a no-op.
    pub fn apply_patch(&mut self, patch: UserPatch) -> DomainResult<()> {
        if let Some(role) = patch.role {
            if role != self.role {
                return Err(DomainError::validation("role cannot be changed after creation"));
            }
        }
        if let Some(email) = &patch.email {
            if !self.has_email(email) {
                return Err(DomainError::validation("email cannot be changed after creation"));
            }
        }

        let name = patch.name.as_deref().map(|n| required("name", n)).transpose()?;
        let department = patch
            .department
            .as_deref()
            .map(|d| required("department", d))
            .transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(department) = department {
            self.department = department;
        }
        if patch.avatar.is_some() {
            self.avatar = patch.avatar;
        }
        Ok(())
    }

    pub fn principal(&self) -> Principal {
        Principal::new(
            self.id,
            self.email.clone(),
            self.name.clone(),
            self.role,
            self.department.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user() -> NewUser {
        NewUser {
            name: " Rahul Kumar ".into(),
            email: "Employeelogin2025@Gmail.com".into(),
            role: Role::Employee,
            department: "Marketing".into(),
            avatar: None,
        }
    }

    #[test]
    fn creation_normalizes_fields() {
        let user = new_user().into_user(UserId::new()).unwrap();
        assert_eq!(user.name, "Rahul Kumar");
        assert_eq!(user.email, "employeelogin2025@gmail.com");
        assert!(user.has_email("EMPLOYEELOGIN2025@gmail.com"));
    }

    #[test]
    fn creation_rejects_bad_input() {
        let mut bad = new_user();
        bad.email = "no-at-sign".into();
        assert!(bad.into_user(UserId::new()).is_err());

        let mut bad = new_user();
        bad.name = "   ".into();
        assert!(bad.into_user(UserId::new()).is_err());
    }

    #[test]
    fn patch_updates_display_fields() {
        let mut user = new_user().into_user(UserId::new()).unwrap();
        user.apply_patch(UserPatch {
            department: Some("Sales".into()),
            email: Some("employeelogin2025@gmail.com".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(user.department, "Sales");
    }

    #[test]
    fn patch_refuses_role_or_email_change() {
        let mut user = new_user().into_user(UserId::new()).unwrap();
        let before = user.clone();

        let err = user
            .apply_patch(UserPatch {
                name: Some("New Name".into()),
                role: Some(Role::Manager),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = user
            .apply_patch(UserPatch {
                email: Some("other@example.com".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(user, before);
    }
}
