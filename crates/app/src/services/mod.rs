//! Service wiring: stores and notifier in, the two application services out.

use std::sync::Arc;

use budget_eagle_infra::{
    AppConfig, BillStore, HttpNotifier, InMemoryBillStore, InMemoryUserStore, LogNotifier,
    NotificationConfig, Notifier, UserStore,
};

use crate::notify::NotificationDispatcher;

pub mod bills;
pub mod users;

pub use bills::{BillLifecycleService, NewBill};
pub use users::UserDirectoryService;

pub struct Services {
    pub bills: BillLifecycleService,
    pub users: UserDirectoryService,
}

impl Services {
    pub fn new(
        bill_store: Arc<dyn BillStore>,
        user_store: Arc<dyn UserStore>,
        notifier: Arc<dyn Notifier>,
        config: &AppConfig,
    ) -> Self {
        let dispatcher = NotificationDispatcher::new(notifier, config.notifications.delivery);
        Self {
            bills: BillLifecycleService::new(
                bill_store,
                user_store.clone(),
                dispatcher,
                &config.notifications,
            ),
            users: UserDirectoryService::new(user_store),
        }
    }

    /// In-memory stores, notifier chosen from config.
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(InMemoryBillStore::new()),
            Arc::new(InMemoryUserStore::new()),
            notifier_from_config(&config.notifications),
            config,
        )
    }
}

/// HTTP delivery when an endpoint is configured, log-only otherwise.
pub fn notifier_from_config(config: &NotificationConfig) -> Arc<dyn Notifier> {
    match &config.endpoint {
        Some(endpoint) => {
            let notifier = HttpNotifier::new(endpoint.clone());
            match &config.api_key {
                Some(key) => Arc::new(notifier.with_api_key(key.clone())),
                None => Arc::new(notifier),
            }
        }
        None => Arc::new(LogNotifier),
    }
}
