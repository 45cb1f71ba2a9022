//! `budget-eagle-auth`: roles, authorization policy and the identity boundary.
//!
//! Everything here is decoupled from storage: the policy is pure functions over
//! roles and ids, and the identity provider is a trait.

pub mod authorize;
pub mod identity;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod session;
pub mod user;

pub use authorize::{
    AuthzError, ClearScope, Owned, can_add_user, can_delete_bill, can_delete_user,
    can_hard_delete_any_bill, can_review, is_visible, require_add_user, require_bill_deletion,
    require_clear_bills, require_delete_bill, require_delete_user, require_list_users,
    require_review, require_update_user, visible_bills,
};
pub use identity::{AuthOutcome, IdentityError, IdentityProvider, InMemoryIdentityProvider};
pub use permissions::Action;
pub use principal::Principal;
pub use roles::Role;
pub use session::{Session, SessionValidationError, resolve_principal};
pub use user::{NewUser, User, UserPatch, normalize_email};
