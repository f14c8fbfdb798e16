//! cache_list tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use spasi_core::cache::{GenerationInfo, describe_generations};

use crate::state::AppState;
use crate::tools::json_result;

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    /// Version label lookups are served from.
    pub current: String,
    /// Every generation, oldest first.
    pub generations: Vec<GenerationInfo>,
}

/// List cache generations with their entry counts.
pub async fn list_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let output = CacheListOutput {
        current: state.current_cache_name().await,
        generations: describe_generations(state.storage.as_ref()).await?,
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{active_host, output};

    #[tokio::test]
    async fn test_list_after_install() {
        let (state, _) = active_host().await;
        state.storage.open("spasi-bg-v12").await.unwrap();

        let out: CacheListOutput = output(&list_impl(&state).await.unwrap());
        assert_eq!(out.current, "spasi-bg-v13");
        assert_eq!(
            out.generations,
            vec![
                GenerationInfo { name: "spasi-bg-v13".into(), entries: 5 },
                GenerationInfo { name: "spasi-bg-v12".into(), entries: 0 },
            ]
        );
    }
}
