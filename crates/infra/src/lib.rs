//! Infrastructure layer: stores, notifier, blob storage and configuration.
//!
//! Every boundary is an async trait with an in-memory adapter for tests and the
//! local demo. Only the notifier has a network adapter.

pub mod bill_store;
pub mod blob_store;
pub mod config;
pub mod notifier;
pub mod user_store;

pub use bill_store::{BillChange, BillStore, InMemoryBillStore, StoreError};
pub use blob_store::{BlobError, BlobStore, InMemoryBlobStore};
pub use config::{AppConfig, ConfigError, DeliveryMode, LoadOptions, NotificationConfig};
pub use notifier::{
    HttpNotifier, LogNotifier, Notification, NotificationError, Notifier, OutboxNotifier,
};
pub use user_store::{InMemoryUserStore, UserStore};
