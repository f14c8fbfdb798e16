//! sw_notification_click tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use spasi_core::Error;
use spasi_core::clients::ClientInfo;
use spasi_core::controller::{ClickOutcome, NotificationClick};

use super::json_result;
use crate::state::AppState;

/// Parameters for the sw_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// Id returned by sw_push.
    pub notification_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClickAction {
    Focused,
    Opened,
}

/// Output from the sw_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickOutput {
    pub action: ClickAction,
    pub client: ClientInfo,
}

/// Implementation of the sw_notification_click tool.
pub async fn click_impl(state: &AppState, params: SwNotificationClickParams) -> Result<CallToolResult, McpError> {
    if params.notification_id.is_empty() {
        return Err(Error::InvalidInput("notification_id cannot be empty".into()).into());
    }

    let click = NotificationClick { notification_id: params.notification_id };
    let output = match state.registration.notification_click(click).await? {
        ClickOutcome::Focused(client) => SwNotificationClickOutput { action: ClickAction::Focused, client },
        ClickOutcome::Opened(client) => SwNotificationClickOutput { action: ClickAction::Opened, client },
    };
    json_result(&output)
}
