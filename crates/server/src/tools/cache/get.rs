//! cache_get tool implementation.
//!
//! Retrieves one stored entry from a cache generation.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use spasi_core::http::canonical_url;
use spasi_core::{Error, RequestKey};

use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Request URL, relative to the app origin or absolute. The fragment is ignored.
    pub url: String,

    /// Generation to look in (default: the current one).
    #[serde(default)]
    pub cache_name: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub cache_name: String,
    pub key: RequestKey,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub body_sha256: String,
    pub stored_at: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(state: &AppState, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let cache_name = match params.cache_name {
        Some(name) => name,
        None => state.current_cache_name().await,
    };
    let origin = state.config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
    let key = RequestKey::get(canonical_url(&origin, &params.url));

    let entry = state
        .storage
        .entry(&cache_name, &key)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{key} in {cache_name}")))?;

    let output = CacheGetOutput {
        cache_name: entry.cache_name,
        key: entry.key,
        status: entry.response.status,
        body: entry.response.body_text(),
        headers: entry.response.headers,
        body_sha256: entry.body_sha256,
        stored_at: entry.stored_at,
    };
    json_result(&output)
}
