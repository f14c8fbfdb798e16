//! Network capability.

use async_trait::async_trait;

use crate::Error;
use crate::http::{Request, Response};

/// Performs a live network fetch on behalf of the worker.
///
/// Resolves with any HTTP status; only transport failures (offline, DNS,
/// timeout, oversized body) are errors.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}
