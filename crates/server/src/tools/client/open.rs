//! client_open tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the client_open tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientOpenParams {
    /// Page the window shows (default: "/").
    #[serde(default = "default_url")]
    pub url: String,
}

fn default_url() -> String {
    "/".into()
}

/// Register an open application window and return its client info.
pub async fn open_impl(state: &AppState, params: ClientOpenParams) -> Result<CallToolResult, McpError> {
    let info = state.windows.open(&params.url).await;
    json_result(&info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{host, output};
    use spasi_core::clients::ClientInfo;

    #[tokio::test]
    async fn test_open_window() {
        let (state, _) = host();
        let first: ClientInfo = output(&open_impl(&state, ClientOpenParams { url: default_url() }).await.unwrap());
        let second: ClientInfo =
            output(&open_impl(&state, ClientOpenParams { url: "/signals".into() }).await.unwrap());

        assert_ne!(first.id, second.id);
        assert_eq!(second.url, "/signals");
        assert!(!second.controlled);
    }
}
