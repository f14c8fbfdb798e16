//! MCP tool implementations.
//!
//! This module contains all tools exposed by the spasi-sw server.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use spasi_core::Error;

pub mod cache;
pub mod client;
pub mod sw_activate;
pub mod sw_fetch;
pub mod sw_notification_click;
pub mod sw_push;
pub mod sw_status;
pub mod sw_update;

#[cfg(test)]
pub(crate) mod testing;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
