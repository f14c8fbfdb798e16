//! Resolution of worker request URLs against the application origin.

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Parse the application origin. Only http(s) origins are accepted.
pub fn parse_origin(input: &str) -> Result<url::Url, UrlError> {
    let origin = url::Url::parse(input.trim()).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    match origin.scheme() {
        "http" | "https" => Ok(origin),
        scheme => Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }
}

/// Resolve a request URL against the origin.
///
/// Paths such as `/index.html` are joined onto the origin; absolute URLs
/// (third-party CDNs, the hosted backend) are kept as given. The fragment is
/// dropped and the query string is preserved as written.
pub fn resolve(origin: &url::Url, input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut resolved = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match resolved.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    resolved.set_fragment(None);
    Ok(resolved)
}
