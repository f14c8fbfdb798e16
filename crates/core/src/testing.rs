//! Fakes for the host capabilities, shared by unit tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::Error;
use crate::cache::{CacheStorage, CachedEntry, MemoryCacheStorage};
use crate::clients::WindowRegistry;
use crate::config::{AppConfig, WorkerConfig};
use crate::controller::Capabilities;
use crate::http::{Request, RequestKey, Response};
use crate::network::Network;
use crate::notify::NotificationLog;

pub fn worker_config(cache_name: &str) -> WorkerConfig {
    AppConfig::default().worker_config().unwrap().with_cache_name(cache_name)
}

/// Network serving canned responses by URL; can be switched offline.
#[derive(Default)]
pub struct FakeNetwork {
    routes: Mutex<BTreeMap<String, Response>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, response: Response) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn serve(&self, url: &str, body: &str) {
        self.route(url, Response::ok(url, body.to_string()));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    /// Serve every default precache URL with a small body.
    pub fn serve_shell(&self) {
        for url in crate::config::DEFAULT_PRECACHE {
            self.serve(url, &format!("shell:{url}"));
        }
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.lock().unwrap().push(request.url.clone());
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

/// Storage wrapper whose `put` and `keys` block until released and whose
/// `delete` can be made to fail for chosen generations.
pub struct ControlledStorage {
    inner: MemoryCacheStorage,
    gate: Semaphore,
    gated: AtomicBool,
    keys_gate: Semaphore,
    keys_gated: AtomicBool,
    failing_deletes: Mutex<HashSet<String>>,
    failing_puts: AtomicBool,
    puts: AtomicUsize,
}

impl ControlledStorage {
    pub fn new() -> Self {
        Self {
            inner: MemoryCacheStorage::new(),
            gate: Semaphore::new(0),
            gated: AtomicBool::new(false),
            keys_gate: Semaphore::new(0),
            keys_gated: AtomicBool::new(false),
            failing_deletes: Mutex::new(HashSet::new()),
            failing_puts: AtomicBool::new(false),
            puts: AtomicUsize::new(0),
        }
    }

    pub fn hold_puts(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    pub fn release_puts(&self) {
        self.gate.add_permits(1024);
    }

    pub fn hold_keys(&self) {
        self.keys_gated.store(true, Ordering::SeqCst);
    }

    pub fn release_keys(&self) {
        self.keys_gate.add_permits(1024);
    }

    pub fn fail_puts(&self) {
        self.failing_puts.store(true, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, cache_name: &str) {
        self.failing_deletes.lock().unwrap().insert(cache_name.to_string());
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStorage for ControlledStorage {
    async fn open(&self, cache_name: &str) -> Result<(), Error> {
        self.inner.open(cache_name).await
    }

    async fn has(&self, cache_name: &str) -> Result<bool, Error> {
        self.inner.has(cache_name).await
    }

    async fn put(&self, cache_name: &str, key: &RequestKey, response: &Response) -> Result<(), Error> {
        if self.gated.load(Ordering::SeqCst) {
            let _permit = self.gate.acquire().await.map_err(|e| Error::InvalidInput(e.to_string()))?;
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.failing_puts.load(Ordering::SeqCst) {
            return Err(Error::InvalidInput("disk full".into()));
        }
        self.inner.put(cache_name, key, response).await
    }

    async fn put_all(&self, cache_name: &str, entries: &[(RequestKey, Response)]) -> Result<(), Error> {
        self.inner.put_all(cache_name, entries).await
    }

    async fn entry(&self, cache_name: &str, key: &RequestKey) -> Result<Option<CachedEntry>, Error> {
        self.inner.entry(cache_name, key).await
    }

    async fn delete(&self, cache_name: &str) -> Result<bool, Error> {
        if self.failing_deletes.lock().unwrap().contains(cache_name) {
            return Err(Error::InvalidInput(format!("cannot delete {cache_name}")));
        }
        self.inner.delete(cache_name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        if self.keys_gated.load(Ordering::SeqCst) {
            let _permit = self.keys_gate.acquire().await.map_err(|e| Error::InvalidInput(e.to_string()))?;
        }
        self.inner.keys().await
    }

    async fn entries(&self, cache_name: &str) -> Result<Vec<CachedEntry>, Error> {
        self.inner.entries(cache_name).await
    }
}

/// A full set of fakes plus the capability bundle wired from them.
pub struct Harness {
    pub storage: Arc<ControlledStorage>,
    pub network: Arc<FakeNetwork>,
    pub windows: Arc<WindowRegistry>,
    pub notifications: Arc<NotificationLog>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(ControlledStorage::new()),
            network: Arc::new(FakeNetwork::new()),
            windows: Arc::new(WindowRegistry::new()),
            notifications: Arc::new(NotificationLog::new()),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            storage: self.storage.clone(),
            network: self.network.clone(),
            clients: self.windows.clone(),
            notifications: self.notifications.clone(),
        }
    }
}
