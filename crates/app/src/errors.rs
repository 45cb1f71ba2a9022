//! Service-level error: everything an operation can surface to its caller.

use thiserror::Error;

use budget_eagle_auth::AuthzError;
use budget_eagle_core::DomainError;
use budget_eagle_infra::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Authorization(#[from] AuthzError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Stable name of the failure class, for callers that branch on it.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Domain(err) => match err {
                DomainError::Validation(_) => "ValidationError",
                DomainError::NotFound { .. } => "NotFoundError",
                DomainError::InvalidTransition { .. } => "InvalidTransitionError",
                DomainError::DuplicateEmail(_) => "DuplicateEmailError",
                DomainError::SelfDeletion => "SelfDeletionError",
                DomainError::Conflict(_) => "ConflictError",
            },
            ServiceError::Authorization(_) => "AuthorizationError",
            ServiceError::Store(StoreError::NotFound { .. }) => "NotFoundError",
            ServiceError::Store(_) => "StoreError",
        }
    }

    /// One sentence for the end user. Never contains ids or backend detail.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Domain(DomainError::Validation(msg)) => {
                let msg = msg.trim();
                let mut chars = msg.chars();
                match chars.next() {
                    Some(first) => format!("{}{}.", first.to_uppercase(), chars.as_str()),
                    None => "The request is invalid.".to_string(),
                }
            }
            ServiceError::Domain(DomainError::NotFound { entity, .. })
            | ServiceError::Store(StoreError::NotFound { entity, .. }) => {
                format!("The requested {entity} no longer exists.")
            }
            ServiceError::Domain(DomainError::InvalidTransition { from, .. }) => {
                format!("This bill has already been {from} and cannot be reviewed again.")
            }
            ServiceError::Domain(DomainError::DuplicateEmail(_)) => {
                "A user with this email already exists.".to_string()
            }
            ServiceError::Domain(DomainError::SelfDeletion) => {
                "You cannot delete your own account.".to_string()
            }
            ServiceError::Domain(DomainError::Conflict(_)) | ServiceError::Store(StoreError::Conflict { .. }) => {
                "Someone else changed this record at the same time. Please refresh and try again.".to_string()
            }
            ServiceError::Authorization(AuthzError::Forbidden { required, .. }) => {
                format!("You do not have permission to do this; it requires {required}.")
            }
            ServiceError::Store(_) => {
                "The service is temporarily unavailable. Please try again.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use budget_eagle_auth::Action;

    use super::*;

    #[test]
    fn kinds_follow_the_taxonomy() {
        let cases: Vec<(ServiceError, &str)> = vec![
            (DomainError::validation("x").into(), "ValidationError"),
            (DomainError::not_found("bill", "1").into(), "NotFoundError"),
            (DomainError::invalid_transition("approved", "rejected").into(), "InvalidTransitionError"),
            (DomainError::DuplicateEmail("a@b".into()).into(), "DuplicateEmailError"),
            (DomainError::SelfDeletion.into(), "SelfDeletionError"),
            (AuthzError::Forbidden { action: Action::ReviewBill, required: "manager" }.into(), "AuthorizationError"),
            (StoreError::Backend("down".into()).into(), "StoreError"),
            (StoreError::not_found("user", "9").into(), "NotFoundError"),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "{err:?}");
        }
    }

    #[test]
    fn user_messages_hide_internals() {
        let id = "0190f0a4-6e8b-7c1d-9d1e-1234567890ab";
        let msg = ServiceError::from(DomainError::not_found("bill", id)).user_message();
        assert_eq!(msg, "The requested bill no longer exists.");
        assert!(!msg.contains(id));

        let msg = ServiceError::from(StoreError::Backend("connection reset by peer".into())).user_message();
        assert!(!msg.contains("connection reset"));

        let msg = ServiceError::from(DomainError::validation("amount must be greater than zero")).user_message();
        assert_eq!(msg, "Amount must be greater than zero.");
    }
}
