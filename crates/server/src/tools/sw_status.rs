//! sw_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use spasi_core::clients::{ClientInfo, Clients};
use spasi_core::notify::ShownNotification;
use spasi_core::runtime::RegistrationStatus;

use super::json_result;
use crate::state::AppState;

/// Output from the sw_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwStatusOutput {
    pub registration: RegistrationStatus,
    pub clients: Vec<ClientInfo>,
    pub notifications: Vec<ShownNotification>,
}

/// Report workers, open windows and shown notifications.
pub async fn status_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let output = SwStatusOutput {
        registration: state.registration.status().await,
        clients: state.windows.match_all().await?,
        notifications: state.notifications.list().await,
    };
    json_result(&output)
}
