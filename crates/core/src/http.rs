//! Request and response snapshots exchanged between the host and the worker.
//!
//! Header names are stored lower case so lookups are case-insensitive.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Header map with lower-cased names.
pub type Headers = BTreeMap<String, String>;

/// How the page issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document navigation.
    Navigate,
    #[default]
    SameOrigin,
    Cors,
    NoCors,
}

/// An inbound fetch as seen by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: String,
    pub mode: RequestMode,
    pub headers: Headers,
}

impl Request {
    pub fn new(method: &str, url: impl Into<String>) -> Self {
        Self { method: method.to_ascii_uppercase(), url: url.into(), mode: RequestMode::default(), headers: Headers::new() }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// A GET navigation request, as issued when the user opens a page.
    pub fn navigate(url: impl Into<String>) -> Self {
        Self { mode: RequestMode::Navigate, ..Self::get(url) }
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn accept(&self) -> Option<&str> {
        self.header("accept")
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }
}

/// Cache key: method plus full URL, query string included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: "GET".into(), url: url.into() }
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Request URL as a cache identity.
///
/// Resolved against `origin` with the fragment dropped. Same-origin URLs
/// reduce to path and query, so `/index.html`, `/index.html#top` and
/// `http://localhost:5173/index.html` share one key. Other origins keep the
/// absolute form.
pub fn canonical_url(origin: &url::Url, input: &str) -> String {
    let trimmed = input.trim();
    let Ok(mut resolved) = origin.join(trimmed) else {
        return trimmed.split('#').next().unwrap_or_default().to_string();
    };
    resolved.set_fragment(None);

    if resolved.origin() != origin.origin() {
        return resolved.to_string();
    }
    match resolved.query() {
        Some(query) => format!("{}?{query}", resolved.path()),
        None => resolved.path().to_string(),
    }
}

/// A response snapshot. Clones share the body buffer but are otherwise independent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// URL the response was produced for.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl Response {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Bytes>) -> Self {
        Self { url: url.into(), status, status_text: String::new(), headers: Headers::new(), body: body.into() }
    }

    /// A `200 OK` response.
    pub fn ok(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self { status_text: "OK".into(), ..Self::new(url, 200, body) }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_normalized() {
        let req = Request::new("post", "/api/signals");
        assert_eq!(req.method, "POST");
        assert!(!req.is_get());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let req = Request::get("/index.html").with_header("Accept", "text/html");
        assert_eq!(req.accept(), Some("text/html"));
        assert_eq!(req.header("ACCEPT"), Some("text/html"));
    }

    fn origin() -> url::Url {
        url::Url::parse("http://localhost:5173").unwrap()
    }

    #[test]
    fn test_canonical_url_keeps_query() {
        let a = canonical_url(&origin(), "/api/signals?search=x");
        let b = canonical_url(&origin(), "/api/signals?search=y");
        assert_ne!(a, b);
        assert_eq!(RequestKey::get(a).to_string(), "GET /api/signals?search=x");
    }

    #[test]
    fn test_canonical_url_same_origin_forms_agree() {
        for input in ["/index.html", "/index.html#top", "http://localhost:5173/index.html", " index.html "] {
            assert_eq!(canonical_url(&origin(), input), "/index.html", "{input}");
        }
    }

    #[test]
    fn test_canonical_url_other_origin_absolute() {
        let url = canonical_url(&origin(), "https://abc.supabase.co/rest/v1/signals?id=eq.7#x");
        assert_eq!(url, "https://abc.supabase.co/rest/v1/signals?id=eq.7");
    }

    #[test]
    fn test_response_ok_range() {
        assert!(Response::ok("/", "x").is_ok());
        assert!(Response::new("/", 204, "").is_ok());
        assert!(!Response::new("/", 404, "").is_ok());
    }

    #[test]
    fn test_response_clone_is_equal_snapshot() {
        let original = Response::ok("/index.html", "<html>A</html>").with_header("Content-Type", "text/html");
        let copy = original.clone();
        assert_eq!(copy, original);
        assert_eq!(copy.content_type(), Some("text/html"));
    }
}
