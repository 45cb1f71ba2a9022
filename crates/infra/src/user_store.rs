//! User directory persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use budget_eagle_auth::{User, normalize_email};
use budget_eagle_core::UserId;

use crate::bill_store::StoreError;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the id or (normalized) email is taken.
    async fn insert(&self, user: User) -> Result<User, StoreError>;

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Every user, ordered by name.
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    /// Replace an existing record.
    async fn update(&self, user: User) -> Result<User, StoreError>;

    async fn delete(&self, id: UserId) -> Result<(), StoreError>;
}

/// In-memory user store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().map_err(|_| StoreError::Poisoned)?;
        if users.contains_key(&user.id) {
            return Err(StoreError::conflict("user", user.id, "id already exists"));
        }
        if users.values().any(|u| u.has_email(&user.email)) {
            return Err(StoreError::conflict("user", &user.email, "email already exists"));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let users = self.users.read().map_err(|_| StoreError::Poisoned)?;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let key = normalize_email(email);
        let users = self.users.read().map_err(|_| StoreError::Poisoned)?;
        Ok(users.values().find(|u| u.email == key).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().map_err(|_| StoreError::Poisoned)?;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn update(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().map_err(|_| StoreError::Poisoned)?;
        let slot = users
            .get_mut(&user.id)
            .ok_or_else(|| StoreError::not_found("user", user.id))?;
        *slot = user.clone();
        Ok(user)
    }

    async fn delete(&self, id: UserId) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| StoreError::Poisoned)?;
        users
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("user", id))
    }
}
