//! `budget-eagle-app`: the bill lifecycle and user directory services.
//!
//! Layout:
//! - `services/`: the two application services and their wiring
//! - `notify.rs`: best-effort notification dispatch
//! - `errors.rs`: the error surfaced by every service operation

pub mod errors;
pub mod notify;
pub mod services;

pub use errors::{ServiceError, ServiceResult};
pub use notify::NotificationDispatcher;
pub use services::{BillLifecycleService, NewBill, Services, UserDirectoryService, notifier_from_config};
