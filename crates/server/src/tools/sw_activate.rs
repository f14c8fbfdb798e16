//! sw_activate tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};

use super::json_result;
use crate::state::AppState;

/// Activate the waiting worker; the previous active worker becomes redundant.
pub async fn activate_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let report = state.registration.activate_waiting().await?;
    json_result(&report)
}
