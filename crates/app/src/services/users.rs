//! User directory: account administration and profile lookup.

use std::sync::Arc;

use budget_eagle_auth::{
    NewUser, Principal, Role, Session, User, UserPatch, normalize_email, require_add_user,
    require_delete_user, require_list_users, require_update_user, resolve_principal,
};
use budget_eagle_core::{DomainError, UserId};
use budget_eagle_infra::{StoreError, UserStore};

use crate::errors::{ServiceError, ServiceResult};

pub struct UserDirectoryService {
    users: Arc<dyn UserStore>,
}

impl UserDirectoryService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Create an account record. Credentials are the identity provider's job.
    pub async fn add_user(&self, actor: &Principal, input: NewUser) -> ServiceResult<User> {
        require_add_user(actor, input.role)?;
        let user = input.into_user(UserId::new())?;

        if self.users.find_by_email(&user.email).await?.is_some() {
            return Err(DomainError::DuplicateEmail(user.email).into());
        }

        let email = user.email.clone();
        let user = self.users.insert(user).await.map_err(|err| match err {
            // Lost a race with another insert of the same address.
            StoreError::Conflict { .. } => DomainError::DuplicateEmail(email).into(),
            other => ServiceError::from(other),
        })?;

        tracing::info!(user_id = %user.id, role = %user.role, actor = %actor.id, "user added");
        Ok(user)
    }

    /// Partial profile update. Role and email are fixed after creation.
    pub async fn update_user(&self, actor: &Principal, id: UserId, patch: UserPatch) -> ServiceResult<User> {
        let mut target = self.require_user(id).await?;
        require_update_user(actor, id, target.role)?;

        target.apply_patch(patch)?;
        let updated = self.users.update(target).await?;

        tracing::info!(user_id = %id, actor = %actor.id, "user updated");
        Ok(updated)
    }

    pub async fn delete_user(&self, actor: &Principal, id: UserId) -> ServiceResult<()> {
        if actor.id == id {
            return Err(DomainError::SelfDeletion.into());
        }
        let target = self.require_user(id).await?;
        require_delete_user(actor, target.role)?;

        self.users.delete(id).await?;
        tracing::info!(user_id = %id, actor = %actor.id, "user deleted");
        Ok(())
    }

    pub async fn list_users(&self, actor: &Principal) -> ServiceResult<Vec<User>> {
        require_list_users(actor)?;
        Ok(self.users.list().await?)
    }

    pub async fn get_user(&self, id: UserId) -> ServiceResult<Option<User>> {
        Ok(self.users.get(id).await?)
    }

    /// The acting principal for a session. Sessions without a profile record
    /// act as a least-privileged employee.
    pub async fn principal_for(&self, session: &Session) -> ServiceResult<Principal> {
        let profile = self.users.get(session.principal_id).await?;
        Ok(resolve_principal(session, profile.as_ref()))
    }

    /// Insert the four sample accounts, skipping any whose email is already
    /// taken. Returns the records now in the directory for those emails.
    pub async fn seed_demo_directory(&self) -> ServiceResult<Vec<User>> {
        let mut seeded = Vec::with_capacity(DEMO_USERS.len());
        for (name, email, role, department) in DEMO_USERS {
            if let Some(existing) = self.users.find_by_email(email).await? {
                seeded.push(existing);
                continue;
            }
            let user = User {
                id: UserId::new(),
                name: name.to_string(),
                email: normalize_email(email),
                role,
                department: department.to_string(),
                avatar: Some(DEMO_AVATAR.to_string()),
            };
            seeded.push(self.users.insert(user).await?);
        }
        tracing::info!(users = seeded.len(), "demo directory seeded");
        Ok(seeded)
    }

    async fn require_user(&self, id: UserId) -> ServiceResult<User> {
        self.users
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", id).into())
    }
}

const DEMO_AVATAR: &str = "/placeholder.svg";

const DEMO_USERS: [(&str, &str, Role, &str); 4] = [
    ("Rahul Kumar", "Employeelogin2025@gmail.com", Role::Employee, "Marketing"),
    ("Priya Sharma", "Hrlogin@gmail.com", Role::Hr, "Human Resources"),
    ("Vikram Singh", "Managerlogin2025@gmail.com", Role::Manager, "Operations"),
    ("Arjun Patel", "Financelogin03@gmail.com", Role::Finance, "Finance"),
];
