//! Test fixtures: an in-memory host with a scripted network.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rmcp::model::CallToolResult;
use serde::de::DeserializeOwned;
use spasi_core::config::DEFAULT_PRECACHE;
use spasi_core::network::Network;
use spasi_core::{AppConfig, Error, MemoryCacheStorage, Request, Response};

use crate::state::AppState;

#[derive(Default)]
pub struct ScriptedNetwork {
    routes: Mutex<BTreeMap<String, Response>>,
    offline: AtomicBool,
}

impl ScriptedNetwork {
    pub fn serve(&self, url: &str, body: &str) {
        self.routes.lock().unwrap().insert(url.to_string(), Response::ok(url, body.to_string()));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }
        Ok(self
            .routes
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| Response::new(&request.url, 404, "not found")))
    }
}

/// A host whose network serves the default shell.
pub fn host() -> (Arc<AppState>, Arc<ScriptedNetwork>) {
    let network = Arc::new(ScriptedNetwork::default());
    for url in DEFAULT_PRECACHE {
        network.serve(url, &format!("shell:{url}"));
    }
    let state = AppState::new(AppConfig::default(), Arc::new(MemoryCacheStorage::new()), network.clone());
    (Arc::new(state), network)
}

/// A host with the default worker installed and active.
pub async fn active_host() -> (Arc<AppState>, Arc<ScriptedNetwork>) {
    let (state, network) = host();
    let worker = state.config.worker_config().unwrap();
    state.registration.update(worker).await.unwrap();
    (state, network)
}

/// Decode the JSON text content of a tool result.
pub fn output<T: DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
