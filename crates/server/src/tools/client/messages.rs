//! client_messages tool implementation.
//!
//! Drains the messages the worker posted to a window.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use spasi_core::clients::ClientMessage;

use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the client_messages tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientMessagesParams {
    /// Window id returned by client_open.
    pub client_id: String,
}

/// Output from the client_messages tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientMessagesOutput {
    pub client_id: String,
    pub messages: Vec<ClientMessage>,
}

/// Implementation of the client_messages tool.
pub async fn messages_impl(state: &AppState, params: ClientMessagesParams) -> Result<CallToolResult, McpError> {
    let messages = state.windows.drain(&params.client_id).await?;
    json_result(&ClientMessagesOutput { client_id: params.client_id, messages })
}
