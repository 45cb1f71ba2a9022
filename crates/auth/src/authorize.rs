//! Authorization policy.
//!
//! - No IO
//! - No panics
//! - No business state (pure role/id checks)
//!
//! The `can_*` predicates answer yes/no; the `require_*` helpers turn a denial into
//! an [`AuthzError`] naming the attempted action and the role(s) that would have
//! been allowed. Callers must check before mutating anything.

use serde::Serialize;
use thiserror::Error;

use budget_eagle_core::UserId;

use crate::{Action, Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: '{action}' requires {required}")]
    Forbidden {
        action: Action,
        required: &'static str,
    },
}

impl AuthzError {
    fn forbidden(action: Action, required: &'static str) -> Self {
        Self::Forbidden { action, required }
    }

    pub fn action(&self) -> Action {
        match self {
            AuthzError::Forbidden { action, .. } => *action,
        }
    }
}

/// Anything with a submitting owner, for the visibility filter.
pub trait Owned {
    fn owner(&self) -> UserId;
}

/// Only managers approve or reject bills.
pub fn can_review(actor: Role) -> bool {
    actor == Role::Manager
}

/// Finance onboards managers; managers onboard employees and HR.
pub fn can_add_user(actor: Role, new_role: Role) -> bool {
    match actor {
        Role::Finance => new_role == Role::Manager,
        Role::Manager => matches!(new_role, Role::Employee | Role::Hr),
        Role::Employee | Role::Hr => false,
    }
}

/// Same shape as [`can_add_user`]. Self-deletion is checked by id in the caller.
pub fn can_delete_user(actor: Role, target: Role) -> bool {
    match actor {
        Role::Finance => target == Role::Manager,
        Role::Manager => matches!(target, Role::Employee | Role::Hr),
        Role::Employee | Role::Hr => false,
    }
}

/// Employees and HR may hard-delete bills they submitted, in any status.
pub fn can_delete_bill(actor: Role) -> bool {
    actor.is_submitter()
}

/// Finance may hard-delete any bill regardless of owner.
pub fn can_hard_delete_any_bill(actor: Role) -> bool {
    actor == Role::Finance
}

pub fn is_visible<T: Owned>(actor: Role, actor_id: UserId, item: &T) -> bool {
    actor.is_administrative() || item.owner() == actor_id
}

/// Employees/HR see their own items; managers and finance see everything.
pub fn visible_bills<'a, T: Owned>(actor: Role, actor_id: UserId, items: &'a [T]) -> Vec<&'a T> {
    items
        .iter()
        .filter(|item| is_visible(actor, actor_id, *item))
        .collect()
}

/// Which bills a "clear" request may remove.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearScope {
    /// Only bills submitted by the actor.
    Own,
    /// Every bill in the store.
    All,
}

pub fn require_review(actor: &Principal) -> Result<(), AuthzError> {
    if can_review(actor.role) {
        Ok(())
    } else {
        Err(AuthzError::forbidden(Action::ReviewBill, "manager"))
    }
}

pub fn require_add_user(actor: &Principal, new_role: Role) -> Result<(), AuthzError> {
    if can_add_user(actor.role, new_role) {
        return Ok(());
    }
    Err(AuthzError::forbidden(Action::AddUser, admin_for(new_role)))
}

pub fn require_delete_user(actor: &Principal, target_role: Role) -> Result<(), AuthzError> {
    if can_delete_user(actor.role, target_role) {
        return Ok(());
    }
    Err(AuthzError::forbidden(Action::DeleteUser, admin_for(target_role)))
}

/// Profile edits: anyone may edit themselves; otherwise the same rule as deletion.
pub fn require_update_user(
    actor: &Principal,
    target_id: UserId,
    target_role: Role,
) -> Result<(), AuthzError> {
    if actor.id == target_id || can_delete_user(actor.role, target_role) {
        return Ok(());
    }
    Err(AuthzError::forbidden(Action::UpdateUser, admin_for(target_role)))
}

pub fn require_list_users(actor: &Principal) -> Result<(), AuthzError> {
    if actor.role.is_administrative() {
        Ok(())
    } else {
        Err(AuthzError::forbidden(Action::ListUsers, "manager or finance"))
    }
}

const BILL_DELETERS: &str = "the submitting employee/hr or finance";

/// Role gate for bill deletion. Checked before the bill is looked up.
pub fn require_bill_deletion(actor: &Principal) -> Result<(), AuthzError> {
    if can_hard_delete_any_bill(actor.role) || can_delete_bill(actor.role) {
        return Ok(());
    }
    Err(AuthzError::forbidden(Action::DeleteBill, BILL_DELETERS))
}

pub fn require_delete_bill(actor: &Principal, owner: UserId) -> Result<(), AuthzError> {
    if can_hard_delete_any_bill(actor.role) || (can_delete_bill(actor.role) && owner == actor.id) {
        return Ok(());
    }
    Err(AuthzError::forbidden(Action::DeleteBill, BILL_DELETERS))
}

pub fn require_clear_bills(actor: &Principal) -> Result<ClearScope, AuthzError> {
    if can_hard_delete_any_bill(actor.role) {
        Ok(ClearScope::All)
    } else if can_delete_bill(actor.role) {
        Ok(ClearScope::Own)
    } else {
        Err(AuthzError::forbidden(Action::ClearBills, "employee, hr or finance"))
    }
}

/// The administrative role that manages accounts of `role`.
fn admin_for(role: Role) -> &'static str {
    match role {
        Role::Employee | Role::Hr => "manager",
        Role::Manager => "finance",
        Role::Finance => "no role (finance accounts are provisioned out of band)",
    }
}
