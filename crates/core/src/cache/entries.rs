//! SQLite implementation of [`CacheStorage`].
//!
//! Generations are rows of `generations`; entries cascade-delete with them.

use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::hash::{body_digest, compute_entry_key};
use super::{CacheStorage, CachedEntry, ensure_storable};
use crate::Error;
use crate::http::{Headers, RequestKey, Response};

fn ensure_generation(conn: &rusqlite::Connection, cache_name: &str, now: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO generations (name, seq, created_at)
         VALUES (?1, (SELECT COALESCE(MAX(seq), 0) + 1 FROM generations), ?2)",
        params![cache_name, now],
    )?;
    Ok(())
}

fn insert_entry(
    conn: &rusqlite::Connection, cache_name: &str, key: &RequestKey, response: &Response, now: &str,
) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&response.headers)
        .map_err(|e| Error::InvalidInput(format!("unserializable headers for {key}: {e}")))?;

    conn.execute(
        "INSERT INTO entries (
            cache_name, entry_key, method, url, response_url, status, status_text,
            headers_json, body, body_sha256, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(cache_name, entry_key) DO UPDATE SET
            response_url = excluded.response_url,
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            body_sha256 = excluded.body_sha256,
            stored_at = excluded.stored_at",
        params![
            cache_name,
            compute_entry_key(&key.method, &key.url),
            &key.method,
            &key.url,
            &response.url,
            response.status as i64,
            &response.status_text,
            headers_json,
            response.body.as_ref(),
            body_digest(&response.body),
            now,
        ],
    )?;
    Ok(())
}

/// Raw row as read from `entries`, decoded outside the rusqlite row callback.
struct EntryRow {
    method: String,
    url: String,
    response_url: String,
    status: i64,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
    body_sha256: String,
    stored_at: String,
}

impl EntryRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            method: row.get(0)?,
            url: row.get(1)?,
            response_url: row.get(2)?,
            status: row.get(3)?,
            status_text: row.get(4)?,
            headers_json: row.get(5)?,
            body: row.get(6)?,
            body_sha256: row.get(7)?,
            stored_at: row.get(8)?,
        })
    }

    fn into_entry(self, cache_name: &str) -> Result<CachedEntry, Error> {
        let headers: Headers = serde_json::from_str(&self.headers_json)
            .map_err(|e| Error::CorruptEntry(format!("{} {}: headers: {e}", self.method, self.url)))?;
        let status = u16::try_from(self.status)
            .map_err(|_| Error::CorruptEntry(format!("{} {}: status {}", self.method, self.url, self.status)))?;

        Ok(CachedEntry {
            cache_name: cache_name.to_string(),
            key: RequestKey { method: self.method, url: self.url },
            response: Response {
                url: self.response_url,
                status,
                status_text: self.status_text,
                headers,
                body: Bytes::from(self.body),
            },
            body_sha256: self.body_sha256,
            stored_at: self.stored_at,
        })
    }
}

const ENTRY_COLUMNS: &str =
    "method, url, response_url, status, status_text, headers_json, body, body_sha256, stored_at";

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, cache_name: &str) -> Result<(), Error> {
        let cache_name = cache_name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> { ensure_generation(conn, &cache_name, &now) })
            .await
            .map_err(Error::from)
    }

    async fn has(&self, cache_name: &str) -> Result<bool, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
                    params![cache_name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, cache_name: &str, key: &RequestKey, response: &Response) -> Result<(), Error> {
        ensure_storable(key, response)?;
        let cache_name = cache_name.to_string();
        let key = key.clone();
        let response = response.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_generation(&tx, &cache_name, &now)?;
                insert_entry(&tx, &cache_name, &key, &response, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, cache_name: &str, entries: &[(RequestKey, Response)]) -> Result<(), Error> {
        for (key, response) in entries {
            ensure_storable(key, response)?;
        }
        let cache_name = cache_name.to_string();
        let entries = entries.to_vec();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_generation(&tx, &cache_name, &now)?;
                for (key, response) in &entries {
                    insert_entry(&tx, &cache_name, key, response, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn entry(&self, cache_name: &str, key: &RequestKey) -> Result<Option<CachedEntry>, Error> {
        let cache_name = cache_name.to_string();
        let entry_key = compute_entry_key(&key.method, &key.url);
        self.conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE cache_name = ?1 AND entry_key = ?2");
                let row = conn.query_row(&sql, params![cache_name, entry_key], EntryRow::from_row);

                match row {
                    Ok(row) => Ok(Some(row.into_entry(&cache_name)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, cache_name: &str) -> Result<bool, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE name = ?1", params![cache_name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY seq ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn entries(&self, cache_name: &str) -> Result<Vec<CachedEntry>, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<CachedEntry>, Error> {
                let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE cache_name = ?1 ORDER BY url, method");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![cache_name], EntryRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows.into_iter().map(|row| row.into_entry(&cache_name)).collect()
            })
            .await
            .map_err(Error::from)
    }
}
