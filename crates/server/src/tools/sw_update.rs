//! sw_update tool implementation.
//!
//! Installs a worker generation, activating it at once when it skips waiting.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use spasi_core::Error;

use super::json_result;
use crate::state::AppState;

/// Parameters for the sw_update tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwUpdateParams {
    /// Version label to install (default: the configured cache name).
    #[serde(default)]
    pub cache_name: Option<String>,

    /// Override whether the new worker activates without waiting.
    #[serde(default)]
    pub skip_waiting: Option<bool>,
}

/// Implementation of the sw_update tool.
pub async fn update_impl(state: &AppState, params: SwUpdateParams) -> Result<CallToolResult, McpError> {
    let mut worker = state.config.worker_config().map_err(|e| Error::InvalidInput(e.to_string()))?;

    if let Some(cache_name) = params.cache_name {
        if cache_name.trim().is_empty() {
            return Err(Error::InvalidInput("cache_name cannot be empty".into()).into());
        }
        worker = worker.with_cache_name(cache_name);
    }
    if let Some(skip_waiting) = params.skip_waiting {
        worker = worker.with_skip_waiting(skip_waiting);
    }

    let outcome = state.registration.update(worker).await?;
    json_result(&outcome)
}
