//! Fire-and-forget notification dispatch.
//!
//! A batch is delivered in order. A failed send is logged and the rest of the
//! batch still goes out; nothing is reported back to the operation.

use std::sync::Arc;

use budget_eagle_infra::{DeliveryMode, Notification, Notifier};

#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    mode: DeliveryMode,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, mode: DeliveryMode) -> Self {
        Self { notifier, mode }
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    pub async fn dispatch(&self, batch: Vec<Notification>) {
        if batch.is_empty() {
            return;
        }
        match self.mode {
            DeliveryMode::Inline => deliver(self.notifier.clone(), batch).await,
            DeliveryMode::Detached => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(deliver(self.notifier.clone(), batch));
                }
                Err(_) => {
                    tracing::warn!(count = batch.len(), "no async runtime; notifications dropped");
                }
            },
        }
    }
}

async fn deliver(notifier: Arc<dyn Notifier>, batch: Vec<Notification>) {
    for notification in &batch {
        match notifier.send(notification).await {
            Ok(()) => tracing::debug!(to = %notification.to, subject = %notification.subject, "notification sent"),
            Err(err) => tracing::warn!(
                to = %notification.to,
                subject = %notification.subject,
                error = %err,
                "notification failed; continuing"
            ),
        }
    }
}
