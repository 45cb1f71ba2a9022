//! Identity provider boundary.
//!
//! The hosted auth service is consumed, not implemented: it verifies credentials
//! and hands back a session. The in-memory provider below backs tests and the
//! local demo.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use thiserror::Error;

use budget_eagle_core::UserId;

use crate::Session;
use crate::user::normalize_email;

/// Result of a successful credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub principal_id: UserId,
    pub email_confirmed: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account is already registered for {0}")]
    AlreadyRegistered(String),

    #[error("identity backend unavailable: {0}")]
    Backend(String),
}

pub type SessionListener = Box<dyn Fn(Option<&Session>) + Send + Sync>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, email: &str, password: &str) -> Result<AuthOutcome, IdentityError>;

    /// The current session, if any and still valid.
    async fn session(&self) -> Option<Session>;

    /// Register a callback fired on sign-in (`Some`) and sign-out (`None`).
    fn on_session_change(&self, listener: SessionListener);

    async fn sign_out(&self);
}

#[derive(Debug, Clone)]
struct Account {
    id: UserId,
    password: String,
    email_confirmed: bool,
}

/// Single-session, in-process provider. Passwords are held in memory as given,
/// so this is for dev/tests only.
pub struct InMemoryIdentityProvider {
    accounts: RwLock<HashMap<String, Account>>,
    current: RwLock<Option<Session>>,
    listeners: Mutex<Vec<SessionListener>>,
    ttl: Duration,
}

impl InMemoryIdentityProvider {
    pub fn new(ttl: Duration) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            current: RwLock::new(None),
            listeners: Mutex::new(Vec::new()),
            ttl,
        }
    }

    pub fn register(&self, id: UserId, email: &str, password: &str) -> Result<(), IdentityError> {
        let key = normalize_email(email);
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| IdentityError::Backend("account registry lock poisoned".into()))?;
        if accounts.contains_key(&key) {
            return Err(IdentityError::AlreadyRegistered(key));
        }
        accounts.insert(
            key,
            Account {
                id,
                password: password.to_string(),
                email_confirmed: true,
            },
        );
        Ok(())
    }

    fn set_session(&self, session: Option<Session>) {
        if let Ok(mut current) = self.current.write() {
            *current = session.clone();
        }
        if let Ok(listeners) = self.listeners.lock() {
            for listener in listeners.iter() {
                listener(session.as_ref());
            }
        }
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new(Duration::hours(12))
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn authenticate(&self, email: &str, password: &str) -> Result<AuthOutcome, IdentityError> {
        let key = normalize_email(email);
        let account = {
            let accounts = self
                .accounts
                .read()
                .map_err(|_| IdentityError::Backend("account registry lock poisoned".into()))?;
            accounts.get(&key).cloned()
        };

        let account = match account {
            Some(a) if a.password == password => a,
            _ => {
                tracing::info!(email = %key, "authentication rejected");
                return Err(IdentityError::InvalidCredentials);
            }
        };

        self.set_session(Some(Session::issue(account.id, key, Utc::now(), self.ttl)));

        Ok(AuthOutcome {
            principal_id: account.id,
            email_confirmed: account.email_confirmed,
        })
    }

    async fn session(&self) -> Option<Session> {
        let session = self.current.read().ok()?.clone()?;
        session.validate(Utc::now()).ok()?;
        Some(session)
    }

    fn on_session_change(&self, listener: SessionListener) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(listener);
        }
    }

    async fn sign_out(&self) {
        self.set_session(None);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn sign_in_and_out_notify_listeners() {
        let provider = InMemoryIdentityProvider::default();
        let id = UserId::new();
        provider.register(id, "Hrlogin@gmail.com", "password").unwrap();

        let signed_in = Arc::new(AtomicUsize::new(0));
        let signed_out = Arc::new(AtomicUsize::new(0));
        let (i, o) = (signed_in.clone(), signed_out.clone());
        provider.on_session_change(Box::new(move |s| {
            if s.is_some() {
                i.fetch_add(1, Ordering::SeqCst);
            } else {
                o.fetch_add(1, Ordering::SeqCst);
            }
        }));

        let outcome = provider.authenticate("hrlogin@gmail.com", "password").await.unwrap();
        assert_eq!(outcome.principal_id, id);
        assert!(outcome.email_confirmed);
        assert_eq!(provider.session().await.unwrap().principal_id, id);

        provider.sign_out().await;
        assert!(provider.session().await.is_none());
        assert_eq!(signed_in.load(Ordering::SeqCst), 1);
        assert_eq!(signed_out.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let provider = InMemoryIdentityProvider::default();
        provider.register(UserId::new(), "a@example.com", "right").unwrap();

        let err = provider.authenticate("a@example.com", "wrong").await.unwrap_err();
        assert_eq!(err, IdentityError::InvalidCredentials);
        assert!(provider.session().await.is_none());
    }

    #[test]
    fn duplicate_registration_fails() {
        let provider = InMemoryIdentityProvider::default();
        provider.register(UserId::new(), "a@example.com", "x").unwrap();
        assert!(matches!(
            provider.register(UserId::new(), "A@example.com", "y"),
            Err(IdentityError::AlreadyRegistered(_))
        ));
    }
}
