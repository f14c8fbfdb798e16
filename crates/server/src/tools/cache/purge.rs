//! cache_purge tool implementation.
//!
//! Deletes one named generation, or every generation except the current one.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use spasi_core::Error;

use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Delete this generation.
    #[serde(default)]
    pub cache_name: Option<String>,

    /// Delete every generation except the current one.
    #[serde(default)]
    pub stale: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Generations deleted.
    pub deleted: Vec<String>,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(state: &AppState, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let targets = match (params.cache_name, params.stale) {
        (Some(name), false) => vec![name],
        (None, true) => {
            let current = state.current_cache_name().await;
            state.storage.keys().await?.into_iter().filter(|name| *name != current).collect()
        }
        _ => {
            return Err(Error::InvalidInput("Exactly one of cache_name or stale must be specified".to_string()).into());
        }
    };

    let current = state.current_cache_name().await;
    let mut deleted = Vec::new();
    for name in targets {
        if name == current {
            tracing::warn!(cache = %name, "purging the current generation");
        }
        if state.storage.delete(&name).await? {
            deleted.push(name);
        }
    }

    json_result(&CachePurgeOutput { deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{active_host, output};

    #[tokio::test]
    async fn test_purge_stale() {
        let (state, _) = active_host().await;
        state.storage.open("spasi-bg-v11").await.unwrap();
        state.storage.open("spasi-bg-v12").await.unwrap();

        let params = CachePurgeParams { cache_name: None, stale: true };
        let out: CachePurgeOutput = output(&purge_impl(&state, params).await.unwrap());
        assert_eq!(out.deleted, vec!["spasi-bg-v11", "spasi-bg-v12"]);
        assert_eq!(state.storage.keys().await.unwrap(), vec!["spasi-bg-v13"]);
    }

    #[tokio::test]
    async fn test_purge_named() {
        let (state, _) = active_host().await;
        let params = CachePurgeParams { cache_name: Some("spasi-bg-v13".into()), stale: false };

        let out: CachePurgeOutput = output(&purge_impl(&state, params).await.unwrap());
        assert_eq!(out.deleted, vec!["spasi-bg-v13"]);
    }

    #[tokio::test]
    async fn test_purge_unknown_name() {
        let (state, _) = active_host().await;
        let params = CachePurgeParams { cache_name: Some("spasi-bg-v1".into()), stale: false };

        let out: CachePurgeOutput = output(&purge_impl(&state, params).await.unwrap());
        assert!(out.deleted.is_empty());
    }

    #[tokio::test]
    async fn test_purge_no_params() {
        let (state, _) = active_host().await;
        assert!(purge_impl(&state, CachePurgeParams::default()).await.is_err());
    }
}
