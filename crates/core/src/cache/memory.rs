//! In-process implementation of [`CacheStorage`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::hash::body_digest;
use super::{CacheStorage, CachedEntry, ensure_storable};
use crate::Error;
use crate::http::{RequestKey, Response};

#[derive(Debug, Default)]
struct Generation {
    seq: u64,
    entries: BTreeMap<RequestKey, CachedEntry>,
}

/// Cache storage held in memory; contents die with the process.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    generations: RwLock<BTreeMap<String, Generation>>,
    next_seq: std::sync::atomic::AtomicU64,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn generation<'a>(&self, map: &'a mut BTreeMap<String, Generation>, cache_name: &str) -> &'a mut Generation {
        map.entry(cache_name.to_string()).or_insert_with(|| Generation {
            seq: self.next_seq.fetch_add(1, std::sync::atomic::Ordering::Relaxed),
            entries: BTreeMap::new(),
        })
    }
}

fn snapshot(cache_name: &str, key: &RequestKey, response: &Response, now: &str) -> CachedEntry {
    CachedEntry {
        cache_name: cache_name.to_string(),
        key: key.clone(),
        response: response.clone(),
        body_sha256: body_digest(&response.body),
        stored_at: now.to_string(),
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, cache_name: &str) -> Result<(), Error> {
        let mut map = self.generations.write().await;
        self.generation(&mut map, cache_name);
        Ok(())
    }

    async fn has(&self, cache_name: &str) -> Result<bool, Error> {
        Ok(self.generations.read().await.contains_key(cache_name))
    }

    async fn put(&self, cache_name: &str, key: &RequestKey, response: &Response) -> Result<(), Error> {
        ensure_storable(key, response)?;
        let now = chrono::Utc::now().to_rfc3339();
        let mut map = self.generations.write().await;
        let generation = self.generation(&mut map, cache_name);
        generation.entries.insert(key.clone(), snapshot(cache_name, key, response, &now));
        Ok(())
    }

    async fn put_all(&self, cache_name: &str, entries: &[(RequestKey, Response)]) -> Result<(), Error> {
        for (key, response) in entries {
            ensure_storable(key, response)?;
        }
        let now = chrono::Utc::now().to_rfc3339();
        let mut map = self.generations.write().await;
        let generation = self.generation(&mut map, cache_name);
        for (key, response) in entries {
            generation.entries.insert(key.clone(), snapshot(cache_name, key, response, &now));
        }
        Ok(())
    }

    async fn entry(&self, cache_name: &str, key: &RequestKey) -> Result<Option<CachedEntry>, Error> {
        let map = self.generations.read().await;
        Ok(map.get(cache_name).and_then(|g| g.entries.get(key)).cloned())
    }

    async fn delete(&self, cache_name: &str) -> Result<bool, Error> {
        Ok(self.generations.write().await.remove(cache_name).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        let map = self.generations.read().await;
        let mut names: Vec<(&String, u64)> = map.iter().map(|(name, g)| (name, g.seq)).collect();
        names.sort_by_key(|(_, seq)| *seq);
        Ok(names.into_iter().map(|(name, _)| name.clone()).collect())
    }

    async fn entries(&self, cache_name: &str) -> Result<Vec<CachedEntry>, Error> {
        let map = self.generations.read().await;
        let mut entries: Vec<CachedEntry> = map
            .get(cache_name)
            .map(|g| g.entries.values().cloned().collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| a.key.url.cmp(&b.key.url).then_with(|| a.key.method.cmp(&b.key.method)));
        Ok(entries)
    }
}
