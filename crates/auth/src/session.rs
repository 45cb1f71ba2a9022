use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use budget_eagle_core::UserId;

use crate::{Principal, Role, User};

/// An authenticated session as handed out by the identity provider.
///
/// Carries identity only. Role and department come from the profile record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub principal_id: UserId,
    pub email: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionValidationError {
    #[error("session has expired")]
    Expired,

    #[error("session not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid session time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

impl Session {
    pub fn issue(principal_id: UserId, email: impl Into<String>, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            principal_id,
            email: email.into(),
            issued_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), SessionValidationError> {
        if self.expires_at <= self.issued_at {
            return Err(SessionValidationError::InvalidTimeWindow);
        }
        if now < self.issued_at {
            return Err(SessionValidationError::NotYetValid);
        }
        if now >= self.expires_at {
            return Err(SessionValidationError::Expired);
        }
        Ok(())
    }
}

const DEFAULT_NAME: &str = "User";
const DEFAULT_DEPARTMENT: &str = "General";

/// Build the acting principal from a session and its profile record.
///
/// Without a profile the principal gets the least-privileged defaults
/// (employee in "General").
pub fn resolve_principal(session: &Session, profile: Option<&User>) -> Principal {
    match profile {
        Some(user) => Principal::new(
            session.principal_id,
            session.email.clone(),
            user.name.clone(),
            user.role,
            user.department.clone(),
        ),
        None => Principal::new(
            session.principal_id,
            session.email.clone(),
            DEFAULT_NAME,
            Role::Employee,
            DEFAULT_DEPARTMENT,
        ),
    }
}
