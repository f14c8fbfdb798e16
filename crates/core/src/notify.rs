//! Notifications shown by the worker.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub tag: Option<String>,
    /// Page the notification refers to, if the payload named one.
    pub url: Option<String>,
}

/// A notification on display, with the id the host assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ShownNotification {
    pub id: String,
    pub notification: Notification,
}

#[async_trait]
pub trait Notifications: Send + Sync {
    /// Display a notification and return its id.
    async fn show(&self, notification: Notification) -> Result<String, Error>;

    /// Close a notification. Unknown or already closed ids are errors.
    async fn close(&self, id: &str) -> Result<(), Error>;
}

/// In-process notification tray. Only notifications still on display are kept.
#[derive(Debug, Default)]
pub struct NotificationLog {
    shown: RwLock<Vec<ShownNotification>>,
    next_id: AtomicU64,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn list(&self) -> Vec<ShownNotification> {
        self.shown.read().await.clone()
    }
}

#[async_trait]
impl Notifications for NotificationLog {
    async fn show(&self, notification: Notification) -> Result<String, Error> {
        let id = format!("notification-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        tracing::info!(id = %id, title = %notification.title, "notification shown");
        self.shown.write().await.push(ShownNotification { id: id.clone(), notification });
        Ok(id)
    }

    async fn close(&self, id: &str) -> Result<(), Error> {
        let mut shown = self.shown.write().await;
        let Some(index) = shown.iter().position(|n| n.id == id) else {
            return Err(Error::Notification(format!("unknown notification {id}")));
        };
        shown.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Notification {
        Notification {
            title: "Spasi.bg".into(),
            body: "Нов сигнал".into(),
            icon: "/icon-192.png".into(),
            tag: None,
            url: None,
        }
    }

    #[tokio::test]
    async fn test_show_and_close() {
        let log = NotificationLog::new();
        let id = log.show(sample()).await.unwrap();

        log.close(&id).await.unwrap();
        assert!(log.list().await.is_empty());
        assert!(matches!(log.close(&id).await, Err(Error::Notification(_))));
    }

    #[tokio::test]
    async fn test_closed_notifications_are_pruned() {
        let log = NotificationLog::new();
        let mut ids = Vec::new();
        for _ in 0..100 {
            ids.push(log.show(sample()).await.unwrap());
        }
        for id in &ids[..99] {
            log.close(id).await.unwrap();
        }

        let remaining = log.list().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, ids[99]);
    }

    #[tokio::test]
    async fn test_close_unknown() {
        let log = NotificationLog::new();
        assert!(matches!(log.close("notification-7").await, Err(Error::Notification(_))));
    }
}
