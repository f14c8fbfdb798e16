//! Offline cache controller.
//!
//! Decides per request whether the network or the current cache generation
//! answers, and keeps that generation populated:
//!
//! - install: precache the shell manifest, all or nothing
//! - activate: claim windows, drop superseded generations, announce the update
//! - fetch: network-first for documents and API calls, cache-first for assets
//! - push / notification click: thin pass-through to the host

use std::sync::Arc;

use futures_util::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::Error;
use crate::cache::CacheStorage;
use crate::classify::{RequestClass, classify};
use crate::clients::{ClientInfo, ClientMessage, Clients};
use crate::config::WorkerConfig;
use crate::http::{Request, RequestKey, Response};
use crate::lifetime::ExtendableLifetime;
use crate::network::Network;
use crate::notify::{Notification, Notifications};

/// Everything the host lends the controller.
#[derive(Clone)]
pub struct Capabilities {
    pub storage: Arc<dyn CacheStorage>,
    pub network: Arc<dyn Network>,
    pub clients: Arc<dyn Clients>,
    pub notifications: Arc<dyn Notifications>,
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("storage", &"<dyn CacheStorage>")
            .field("network", &"<dyn Network>")
            .field("clients", &"<dyn Clients>")
            .field("notifications", &"<dyn Notifications>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InstallOutcome {
    pub cache_name: String,
    pub precached: usize,
    /// Activate without waiting for open windows to close.
    pub skip_waiting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivateReport {
    pub cache_name: String,
    pub claimed: usize,
    /// Superseded generations removed.
    pub deleted: Vec<String>,
    /// Superseded generations that could not be removed.
    pub failed: Vec<String>,
    /// Windows told that an update is ready.
    pub notified: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the host fetches as if no worker were installed.
    Passthrough,
    Respond { response: Response, source: ResponseSource },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushMessage {
    pub data: Option<String>,
}

impl PushMessage {
    pub fn text(data: impl Into<String>) -> Self {
        Self { data: Some(data.into()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Owned by the push SDK; left for its own handler.
    Delegated,
    Shown { id: String, notification: Notification },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationClick {
    pub notification_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Focused(ClientInfo),
    Opened(ClientInfo),
}

/// Fields accepted in a JSON push payload; all optional.
#[derive(Debug, Default, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
    icon: Option<String>,
    tag: Option<String>,
    url: Option<String>,
}

/// Offline cache controller for one deployed version.
#[derive(Debug, Clone)]
pub struct CacheController {
    config: Arc<WorkerConfig>,
    caps: Capabilities,
}

impl CacheController {
    pub fn new(config: Arc<WorkerConfig>, caps: Capabilities) -> Self {
        Self { config, caps }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Precache the shell manifest into the current generation.
    ///
    /// Every manifest URL must come back with an ok status; otherwise the
    /// install fails and nothing is stored.
    pub async fn install(&self) -> Result<InstallOutcome, Error> {
        let cache_name = &self.config.cache_name;
        info!(cache = %cache_name, assets = self.config.precache.len(), "installing");

        self.caps.storage.open(cache_name).await?;

        let entries = try_join_all(self.config.precache.iter().map(|url| self.precache_one(url))).await?;
        self.caps.storage.put_all(cache_name, &entries).await?;

        info!(cache = %cache_name, precached = entries.len(), "install complete");
        Ok(InstallOutcome {
            cache_name: cache_name.clone(),
            precached: entries.len(),
            skip_waiting: self.config.skip_waiting,
        })
    }

    async fn precache_one(&self, url: &str) -> Result<(RequestKey, Response), Error> {
        let request = Request::get(url);
        let response = self
            .caps
            .network
            .fetch(&request)
            .await
            .map_err(|e| Error::InstallFailed { url: url.to_string(), reason: e.to_string() })?;

        if !response.is_ok() {
            return Err(Error::InstallFailed { url: url.to_string(), reason: format!("status {}", response.status) });
        }

        Ok((self.config.key_for(&request), response))
    }

    /// Claim windows, delete superseded generations and announce the update.
    ///
    /// Each deletion stands alone: one failing does not stop the others or
    /// the announcement.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let cache_name = &self.config.cache_name;
        let claimed = self.caps.clients.claim().await?;

        let stale: Vec<String> = self
            .caps
            .storage
            .keys()
            .await?
            .into_iter()
            .filter(|name| name != cache_name)
            .collect();

        let results = join_all(stale.iter().map(|name| async move { (name, self.caps.storage.delete(name).await) })).await;

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for (name, result) in results {
            match result {
                Ok(_) => {
                    info!(cache = %name, "deleted superseded cache");
                    deleted.push(name.clone());
                }
                Err(e) => {
                    warn!(cache = %name, error = %e, "failed to delete superseded cache");
                    failed.push(name.clone());
                }
            }
        }

        let notified = self.announce_update().await;

        info!(cache = %cache_name, claimed, deleted = deleted.len(), notified, "activated");
        Ok(ActivateReport { cache_name: cache_name.clone(), claimed, deleted, failed, notified })
    }

    async fn announce_update(&self) -> usize {
        let clients = match self.caps.clients.match_all().await {
            Ok(clients) => clients,
            Err(e) => {
                warn!(error = %e, "could not list clients for update notice");
                return 0;
            }
        };

        let mut notified = 0;
        for client in clients {
            match self.caps.clients.post_message(&client.id, &ClientMessage::UpdateReady).await {
                Ok(()) => notified += 1,
                Err(e) => warn!(client = %client.id, error = %e, "failed to post update notice"),
            }
        }
        notified
    }

    /// Answer a fetch event.
    ///
    /// On the network-first path the cache write is handed to `lifetime` and
    /// the live response is returned without waiting for it.
    pub async fn fetch(&self, request: &Request, lifetime: &ExtendableLifetime) -> Result<FetchOutcome, Error> {
        let class = classify(&self.config, request);
        debug!(method = %request.method, url = %request.url, ?class, "fetch");

        match class {
            RequestClass::Bypass => Ok(FetchOutcome::Passthrough),
            RequestClass::NetworkFirst => self.network_first(request, lifetime).await,
            RequestClass::CacheFirst => self.cache_first(request).await,
        }
    }

    async fn network_first(&self, request: &Request, lifetime: &ExtendableLifetime) -> Result<FetchOutcome, Error> {
        let network_err = match self.caps.network.fetch(request).await {
            Ok(response) => {
                let storage = Arc::clone(&self.caps.storage);
                let cache_name = self.config.cache_name.clone();
                let key = self.config.key_for(request);
                let copy = response.clone();
                lifetime.wait_until("cache-put", async move { storage.put(&cache_name, &key, &copy).await });

                return Ok(FetchOutcome::Respond { response, source: ResponseSource::Network });
            }
            Err(e) => e,
        };

        debug!(url = %request.url, error = %network_err, "network failed, trying cache");
        match self.caps.storage.match_request(&self.config.cache_name, &self.config.key_for(request)).await {
            Ok(Some(response)) => Ok(FetchOutcome::Respond { response, source: ResponseSource::Cache }),
            Ok(None) => Err(network_err),
            Err(e) => {
                warn!(url = %request.url, error = %e, "cache lookup failed");
                Err(network_err)
            }
        }
    }

    async fn cache_first(&self, request: &Request) -> Result<FetchOutcome, Error> {
        match self.caps.storage.match_request(&self.config.cache_name, &self.config.key_for(request)).await {
            Ok(Some(response)) => return Ok(FetchOutcome::Respond { response, source: ResponseSource::Cache }),
            Ok(None) => {}
            Err(e) => warn!(url = %request.url, error = %e, "cache lookup failed, using network"),
        }

        let response = self.caps.network.fetch(request).await?;
        Ok(FetchOutcome::Respond { response, source: ResponseSource::Network })
    }

    /// Show a notification for a push, unless the push SDK owns it.
    pub async fn push(&self, message: &PushMessage) -> Result<PushOutcome, Error> {
        let text = message.data.as_deref().unwrap_or_default();
        if text.to_lowercase().contains(&self.config.push_sdk_marker) {
            debug!("push owned by SDK, delegating");
            return Ok(PushOutcome::Delegated);
        }

        let notification = self.notification_from(text);
        let id = self.caps.notifications.show(notification.clone()).await?;
        Ok(PushOutcome::Shown { id, notification })
    }

    fn notification_from(&self, text: &str) -> Notification {
        let payload = serde_json::from_str::<PushPayload>(text).unwrap_or_else(|_| PushPayload {
            body: (!text.is_empty()).then(|| text.to_string()),
            ..Default::default()
        });

        Notification {
            title: payload.title.unwrap_or_else(|| self.config.notification_title.clone()),
            body: payload.body.unwrap_or_default(),
            icon: payload.icon.unwrap_or_else(|| self.config.notification_icon.clone()),
            tag: payload.tag,
            url: payload.url,
        }
    }

    /// Close the notification, then focus an open window or open the app root.
    pub async fn notification_click(&self, click: &NotificationClick) -> Result<ClickOutcome, Error> {
        if let Err(e) = self.caps.notifications.close(&click.notification_id).await {
            warn!(id = %click.notification_id, error = %e, "failed to close notification");
        }

        let windows = self.caps.clients.match_all().await?;
        if let Some(window) = windows.first() {
            let focused = self.caps.clients.focus(&window.id).await?;
            return Ok(ClickOutcome::Focused(focused));
        }

        let opened = self.caps.clients.open_window(&self.config.root_url).await?;
        Ok(ClickOutcome::Opened(opened))
    }
}
