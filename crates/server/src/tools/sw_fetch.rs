//! sw_fetch tool implementation.
//!
//! Dispatches a fetch event through the registration and reports where the
//! response came from. The tool returns once the event's deferred cache work
//! has settled.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use spasi_core::runtime::FetchSource;
use spasi_core::{Error, Request, RequestMode};

use super::json_result;
use crate::state::AppState;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Request URL, app-relative (`/index.html`) or absolute.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate", "same-origin" (default), "cors" or "no-cors".
    #[serde(default)]
    pub mode: RequestMode,

    /// Optional Accept header.
    #[serde(default)]
    pub accept: Option<String>,

    /// Additional request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, String>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub body_bytes: usize,
    pub source: FetchSource,
    /// Deferred cache writes that failed after the response was produced.
    pub deferred_failures: usize,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(state: &AppState, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let mut request = Request::new(&params.method, params.url.trim()).with_mode(params.mode);
    for (name, value) in &params.headers {
        request = request.with_header(name, value.clone());
    }
    if let Some(accept) = params.accept {
        request = request.with_header("accept", accept);
    }

    let result = state.registration.fetch(request).await?;
    let deferred_failures = result.lifetime.settle().await;

    let response = result.response;
    let output = SwFetchOutput {
        url: response.url.clone(),
        status: response.status,
        status_text: response.status_text.clone(),
        content_type: response.content_type().map(str::to_string),
        body: response.body_text(),
        body_bytes: response.body.len(),
        headers: response.headers,
        source: result.source,
        deferred_failures,
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{active_host, host, output};
    use spasi_core::RequestKey;

    fn params(url: &str) -> SwFetchParams {
        SwFetchParams {
            url: url.into(),
            method: default_method(),
            mode: RequestMode::default(),
            accept: None,
            headers: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_document_fetch_caches_response() {
        let (state, network) = active_host().await;
        network.serve("/index.html", "<html>A</html>");
        let p = SwFetchParams { accept: Some("text/html".into()), ..params("/index.html") };

        let out: SwFetchOutput = output(&fetch_impl(&state, p).await.unwrap());
        assert_eq!(out.body, "<html>A</html>");
        assert_eq!(out.source, FetchSource::Network);
        assert_eq!(out.deferred_failures, 0);

        let stored = state.storage.match_request("spasi-bg-v13", &RequestKey::get("/index.html")).await.unwrap();
        assert_eq!(stored.unwrap().body_text(), "<html>A</html>");
    }

    #[tokio::test]
    async fn test_offline_navigation_served_from_cache() {
        let (state, network) = active_host().await;
        network.set_offline(true);
        let p = SwFetchParams { mode: RequestMode::Navigate, ..params("/") };

        let out: SwFetchOutput = output(&fetch_impl(&state, p).await.unwrap());
        assert_eq!(out.source, FetchSource::Cache);
        assert_eq!(out.body, "shell:/");
    }

    #[tokio::test]
    async fn test_post_passes_through() {
        let (state, _) = active_host().await;
        let p = SwFetchParams { method: "POST".into(), ..params("/api/signals") };

        let out: SwFetchOutput = output(&fetch_impl(&state, p).await.unwrap());
        assert_eq!(out.source, FetchSource::Passthrough);
        assert_eq!(out.status, 404);
    }

    #[tokio::test]
    async fn test_fetch_without_worker() {
        let (state, _) = host();
        let out: SwFetchOutput = output(&fetch_impl(&state, params("/manifest.json")).await.unwrap());
        assert_eq!(out.source, FetchSource::Passthrough);
        assert_eq!(out.body, "shell:/manifest.json");
    }

    #[tokio::test]
    async fn test_offline_uncached_fails() {
        let (state, network) = active_host().await;
        network.set_offline(true);
        let err = fetch_impl(&state, params("/api/signals?search=y")).await.unwrap_err();
        assert!(err.message.contains("NETWORK_ERROR"));
    }

    #[tokio::test]
    async fn test_empty_url() {
        let (state, _) = host();
        assert!(fetch_impl(&state, params("  ")).await.is_err());
    }
}
