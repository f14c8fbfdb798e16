//! Shared host state behind every tool.

use std::sync::Arc;

use spasi_core::cache::CacheStorage;
use spasi_core::clients::WindowRegistry;
use spasi_core::network::Network;
use spasi_core::notify::NotificationLog;
use spasi_core::{AppConfig, Capabilities, Registration};

/// The host side of the worker: storage, windows, notification tray and the
/// registration that routes events.
pub struct AppState {
    pub config: AppConfig,
    pub registration: Registration,
    pub storage: Arc<dyn CacheStorage>,
    pub windows: Arc<WindowRegistry>,
    pub notifications: Arc<NotificationLog>,
}

impl AppState {
    pub fn new(config: AppConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        let windows = Arc::new(WindowRegistry::new());
        let notifications = Arc::new(NotificationLog::new());
        let caps = Capabilities {
            storage: Arc::clone(&storage),
            network,
            clients: windows.clone(),
            notifications: notifications.clone(),
        };

        Self { config, registration: Registration::new(caps), storage, windows, notifications }
    }

    /// Version label of the active worker, or the configured one before any
    /// worker has activated.
    pub async fn current_cache_name(&self) -> String {
        match self.registration.active().await {
            Some(worker) => worker.cache_name().to_string(),
            None => self.config.cache_name.clone(),
        }
    }
}
