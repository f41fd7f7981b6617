//! Host-facing adapters for the notification platform and window navigation.
//!
//! The worker has no screen of its own. A shown notification is persisted
//! by tag (so a later click can be routed from stored data alone) and logged;
//! navigation requests are recorded in the audit log and returned to the host
//! in the click tool's reply.

use async_trait::async_trait;
use serde_json::json;
use showbell_core::notify::{HostNavigator, Notification, NotificationPlatform};
use showbell_core::{Error, Store};

pub struct StoreNotifier {
    store: Store,
}

impl StoreNotifier {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl NotificationPlatform for StoreNotifier {
    async fn show(&self, notification: &Notification) -> Result<(), Error> {
        self.store
            .record_shown(notification)
            .await
            .map_err(|e| Error::DispatchFailed(format!("could not persist {}: {}", notification.tag, e)))?;
        tracing::info!(
            tag = %notification.tag,
            title = %notification.title,
            body = %notification.body,
            "notification shown"
        );
        Ok(())
    }

    async fn close(&self, tag: &str) -> Result<(), Error> {
        if !self.store.remove_shown(tag).await? {
            tracing::debug!(tag, "closed notification was not showing");
        }
        Ok(())
    }
}

pub struct AuditNavigator {
    store: Store,
}

impl AuditNavigator {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HostNavigator for AuditNavigator {
    async fn open_window(&self, path: &str) -> Result<(), Error> {
        self.store.append_audit("navigate", &json!({ "path": path })).await?;
        Ok(())
    }
}
