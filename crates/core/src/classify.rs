//! Per-request fetch strategy.

use serde::{Deserialize, Serialize};

use crate::config::WorkerConfig;
use crate::http::{Request, RequestMode};

/// How the worker treats a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestClass {
    /// Not intercepted; the request goes straight to the network.
    Bypass,
    /// Document-like: network first, cache as offline fallback.
    NetworkFirst,
    /// Static asset: cache first, network on miss.
    CacheFirst,
}

pub fn classify(config: &WorkerConfig, request: &Request) -> RequestClass {
    if !request.is_get() || config.bypass.iter().any(|p| p.is_match(&request.url)) {
        return RequestClass::Bypass;
    }

    let wants_html = request.accept().is_some_and(|accept| accept.contains("text/html"));
    if request.mode == RequestMode::Navigate
        || wants_html
        || config.network_first.iter().any(|p| p.is_match(&request.url))
    {
        return RequestClass::NetworkFirst;
    }

    RequestClass::CacheFirst
}
