//! Application windows controlled by the worker.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Error;

/// Message posted from the worker to application windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// A new generation is active; the page may prompt the user to reload.
    UpdateReady,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ClientInfo {
    pub id: String,
    pub url: String,
    /// Whether the current worker controls this window.
    pub controlled: bool,
    pub focused: bool,
}

/// Host access to the application's open windows.
#[async_trait]
pub trait Clients: Send + Sync {
    /// Take control of every open window. Returns how many were claimed.
    async fn claim(&self) -> Result<usize, Error>;

    async fn match_all(&self) -> Result<Vec<ClientInfo>, Error>;

    async fn post_message(&self, client_id: &str, message: &ClientMessage) -> Result<(), Error>;

    async fn focus(&self, client_id: &str) -> Result<ClientInfo, Error>;

    async fn open_window(&self, url: &str) -> Result<ClientInfo, Error>;
}

#[derive(Debug)]
struct Window {
    info: ClientInfo,
    inbox: Vec<ClientMessage>,
}

/// In-process window registry: windows are opened by URL and collect posted
/// messages in an inbox until drained.
#[derive(Debug, Default)]
pub struct WindowRegistry {
    windows: RwLock<BTreeMap<String, Window>>,
    next_id: AtomicU64,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly opened window. It is not controlled until claimed.
    pub async fn open(&self, url: &str) -> ClientInfo {
        let id = format!("window-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let info = ClientInfo { id: id.clone(), url: url.to_string(), controlled: false, focused: false };
        self.windows.write().await.insert(id, Window { info: info.clone(), inbox: Vec::new() });
        tracing::debug!(client = %info.id, url, "window opened");
        info
    }

    /// Take every message posted to a window so far.
    pub async fn drain(&self, client_id: &str) -> Result<Vec<ClientMessage>, Error> {
        let mut windows = self.windows.write().await;
        let window = windows
            .get_mut(client_id)
            .ok_or_else(|| Error::Client(format!("unknown client {client_id}")))?;
        Ok(std::mem::take(&mut window.inbox))
    }
}

#[async_trait]
impl Clients for WindowRegistry {
    async fn claim(&self) -> Result<usize, Error> {
        let mut windows = self.windows.write().await;
        let mut claimed = 0;
        for window in windows.values_mut().filter(|w| !w.info.controlled) {
            window.info.controlled = true;
            claimed += 1;
        }
        Ok(claimed)
    }

    async fn match_all(&self) -> Result<Vec<ClientInfo>, Error> {
        Ok(self.windows.read().await.values().map(|w| w.info.clone()).collect())
    }

    async fn post_message(&self, client_id: &str, message: &ClientMessage) -> Result<(), Error> {
        let mut windows = self.windows.write().await;
        let window = windows
            .get_mut(client_id)
            .ok_or_else(|| Error::Client(format!("unknown client {client_id}")))?;
        window.inbox.push(message.clone());
        Ok(())
    }

    async fn focus(&self, client_id: &str) -> Result<ClientInfo, Error> {
        let mut windows = self.windows.write().await;
        if !windows.contains_key(client_id) {
            return Err(Error::Client(format!("unknown client {client_id}")));
        }
        let mut focused = None;
        for (id, window) in windows.iter_mut() {
            window.info.focused = id == client_id;
            if window.info.focused {
                focused = Some(window.info.clone());
            }
        }
        focused.ok_or_else(|| Error::Client(format!("unknown client {client_id}")))
    }

    async fn open_window(&self, url: &str) -> Result<ClientInfo, Error> {
        let info = self.open(url).await;
        self.focus(&info.id).await
    }
}
