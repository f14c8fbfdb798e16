//! Durable cache storage for request/response snapshots.
//!
//! Storage is organised in named generations (one per deployed version label),
//! each holding entries keyed by request method and URL. Two backends implement
//! [`CacheStorage`]:
//!
//! - [`CacheDb`]: SQLite via tokio-rusqlite, WAL mode, versioned migrations
//! - [`MemoryCacheStorage`]: in-process maps, for embedding and tests

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use crate::Error;
use crate::http::{RequestKey, Response};

pub use connection::CacheDb;
pub use memory::MemoryCacheStorage;

/// Key/value store of request/response pairs, grouped into named generations.
///
/// Writes are atomic per key and last-write-wins, so concurrent `put`s for
/// different keys need no coordination.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the named generation if it does not exist yet.
    async fn open(&self, cache_name: &str) -> Result<(), Error>;

    /// Whether the named generation exists.
    async fn has(&self, cache_name: &str) -> Result<bool, Error>;

    /// Store one entry, replacing any previous entry for the same key.
    ///
    /// Opens the generation implicitly.
    async fn put(&self, cache_name: &str, key: &RequestKey, response: &Response) -> Result<(), Error>;

    /// Store a batch of entries; either all are committed or none.
    async fn put_all(&self, cache_name: &str, entries: &[(RequestKey, Response)]) -> Result<(), Error>;

    /// Look up one entry with its bookkeeping.
    async fn entry(&self, cache_name: &str, key: &RequestKey) -> Result<Option<CachedEntry>, Error>;

    /// Look up the stored response for a key in one generation.
    async fn match_request(&self, cache_name: &str, key: &RequestKey) -> Result<Option<Response>, Error> {
        Ok(self.entry(cache_name, key).await?.map(|entry| entry.response))
    }

    /// Delete a generation with all its entries. Returns whether it existed.
    async fn delete(&self, cache_name: &str) -> Result<bool, Error>;

    /// Generation names, oldest first.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Entries of a generation, ordered by URL.
    async fn entries(&self, cache_name: &str) -> Result<Vec<CachedEntry>, Error>;
}

/// A stored entry together with its bookkeeping.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub cache_name: String,
    pub key: RequestKey,
    pub response: Response,
    pub body_sha256: String,
    pub stored_at: String,
}

/// Summary of one generation, for inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GenerationInfo {
    pub name: String,
    pub entries: usize,
}

/// Partial responses cannot be replayed, so they are never stored.
pub(crate) fn ensure_storable(key: &RequestKey, response: &Response) -> Result<(), Error> {
    if response.status == 206 {
        return Err(Error::InvalidInput(format!("refusing to cache partial response for {key}")));
    }
    Ok(())
}

/// List every generation with its entry count.
pub async fn describe_generations(storage: &dyn CacheStorage) -> Result<Vec<GenerationInfo>, Error> {
    let mut out = Vec::new();
    for name in storage.keys().await? {
        let entries = storage.entries(&name).await?.len();
        out.push(GenerationInfo { name, entries });
    }
    Ok(out)
}
