//! sw_push tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use spasi_core::controller::{PushMessage, PushOutcome};
use spasi_core::notify::Notification;

use super::json_result;
use crate::state::AppState;

/// Parameters for the sw_push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Push payload text: JSON `{title, body, icon, url, tag}` or plain text.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Output from the sw_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushOutput {
    /// True when the push belongs to the push SDK and was left to it.
    pub delegated: bool,
    pub notification_id: Option<String>,
    pub notification: Option<Notification>,
}

/// Implementation of the sw_push tool.
pub async fn push_impl(state: &AppState, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let outcome = state.registration.push(PushMessage { data: params.payload }).await?;

    let output = match outcome {
        PushOutcome::Delegated => SwPushOutput { delegated: true, notification_id: None, notification: None },
        PushOutcome::Shown { id, notification } => {
            SwPushOutput { delegated: false, notification_id: Some(id), notification: Some(notification) }
        }
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{active_host, host, output};

    #[tokio::test]
    async fn test_push_shows_notification() {
        let (state, _) = active_host().await;
        let params = SwPushParams { payload: Some(r#"{"title":"Кръводаряване","body":"ИСУЛ"}"#.into()) };

        let out: SwPushOutput = output(&push_impl(&state, params).await.unwrap());
        assert!(!out.delegated);
        assert_eq!(out.notification.unwrap().title, "Кръводаряване");
        assert_eq!(state.notifications.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_push_sdk_payload_delegated() {
        let (state, _) = active_host().await;
        let params = SwPushParams { payload: Some(r#"{"custom":{"a":{"onesignal":1}}}"#.into()) };

        let out: SwPushOutput = output(&push_impl(&state, params).await.unwrap());
        assert!(out.delegated);
        assert!(state.notifications.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_push_uses_defaults() {
        let (state, _) = active_host().await;
        let out: SwPushOutput = output(&push_impl(&state, SwPushParams::default()).await.unwrap());

        let notification = out.notification.unwrap();
        assert_eq!(notification.title, "Spasi.bg");
        assert_eq!(notification.body, "");
    }

    #[tokio::test]
    async fn test_push_without_worker() {
        let (state, _) = host();
        assert!(push_impl(&state, SwPushParams::default()).await.is_err());
    }
}
