//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SPASI_SW_*)
//! 2. TOML config file (if SPASI_SW_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The loaded [`AppConfig`] is turned into an immutable [`WorkerConfig`] that is
//! handed to the controller; nothing about the worker lives in globals.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::http::{Request, RequestKey, canonical_url};

mod validation;

pub use validation::ConfigError;

/// Shell assets precached at install time.
pub const DEFAULT_PRECACHE: &[&str] = &["/", "/index.html", "/manifest.json", "/icon-192.png", "/icon-512.png"];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SPASI_SW_*)
/// 2. TOML config file (if SPASI_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version label of the current cache generation.
    ///
    /// Changing it is what invalidates the previous generation on the next deploy.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// App-relative URLs fetched and stored at install time.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// URL patterns the worker never intercepts (push SDK traffic).
    #[serde(default = "default_bypass_patterns")]
    pub bypass_patterns: Vec<String>,

    /// URL patterns served network-first (API and database calls).
    #[serde(default = "default_network_first_patterns")]
    pub network_first_patterns: Vec<String>,

    /// Payload marker identifying pushes owned by the third-party SDK.
    #[serde(default = "default_push_sdk_marker")]
    pub push_sdk_marker: String,

    /// URL opened when a notification is clicked and no window is open.
    #[serde(default = "default_root_url")]
    pub root_url: String,

    /// Title used when a push payload carries none.
    #[serde(default = "default_notification_title")]
    pub notification_title: String,

    /// Icon used when a push payload carries none.
    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,

    /// Activate a freshly installed worker without waiting for windows to close.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Origin that app-relative URLs are resolved against.
    ///
    /// Set via SPASI_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite cache database.
    ///
    /// Set via SPASI_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_cache_name() -> String {
    "spasi-bg-v13".into()
}

fn default_precache() -> Vec<String> {
    DEFAULT_PRECACHE.iter().map(|s| s.to_string()).collect()
}

fn default_bypass_patterns() -> Vec<String> {
    vec!["(?i)onesignal".into()]
}

fn default_network_first_patterns() -> Vec<String> {
    vec!["/api/".into(), "supabase".into()]
}

fn default_push_sdk_marker() -> String {
    "onesignal".into()
}

fn default_root_url() -> String {
    "/".into()
}

fn default_notification_title() -> String {
    "Spasi.bg".into()
}

fn default_notification_icon() -> String {
    "/icon-192.png".into()
}

fn default_true() -> bool {
    true
}

fn default_origin() -> String {
    "http://localhost:5173".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./spasi-sw-cache.sqlite")
}

fn default_user_agent() -> String {
    "spasi-sw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_name: default_cache_name(),
            precache: default_precache(),
            bypass_patterns: default_bypass_patterns(),
            network_first_patterns: default_network_first_patterns(),
            push_sdk_marker: default_push_sdk_marker(),
            root_url: default_root_url(),
            notification_title: default_notification_title(),
            notification_icon: default_notification_icon(),
            skip_waiting: true,
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed, or
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SPASI_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SPASI_SW_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Parsed application origin.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin).map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Build the immutable worker configuration, compiling every URL pattern.
    pub fn worker_config(&self) -> Result<WorkerConfig, ConfigError> {
        Ok(WorkerConfig {
            cache_name: self.cache_name.clone(),
            origin: self.origin_url()?,
            precache: self.precache.clone(),
            bypass: compile_patterns("bypass_patterns", &self.bypass_patterns)?,
            network_first: compile_patterns("network_first_patterns", &self.network_first_patterns)?,
            push_sdk_marker: self.push_sdk_marker.to_lowercase(),
            root_url: self.root_url.clone(),
            notification_title: self.notification_title.clone(),
            notification_icon: self.notification_icon.clone(),
            skip_waiting: self.skip_waiting,
        })
    }
}

pub(crate) fn compile_patterns(field: &str, patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| ConfigError::Invalid { field: field.into(), reason: format!("`{p}`: {e}") })
        })
        .collect()
}

/// Immutable configuration of one deployed worker version.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub cache_name: String,
    /// Origin cache keys are resolved against.
    pub origin: Url,
    pub precache: Vec<String>,
    pub bypass: Vec<Regex>,
    pub network_first: Vec<Regex>,
    /// Lower-cased; payloads are matched case-insensitively.
    pub push_sdk_marker: String,
    pub root_url: String,
    pub notification_title: String,
    pub notification_icon: String,
    pub skip_waiting: bool,
}

impl WorkerConfig {
    /// Same configuration under a different version label.
    pub fn with_cache_name(mut self, cache_name: impl Into<String>) -> Self {
        self.cache_name = cache_name.into();
        self
    }

    /// Cache key for a request: its method plus the canonical URL.
    pub fn key_for(&self, request: &Request) -> RequestKey {
        RequestKey { method: request.method.clone(), url: canonical_url(&self.origin, &request.url) }
    }

    pub fn with_skip_waiting(mut self, skip_waiting: bool) -> Self {
        self.skip_waiting = skip_waiting;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cache_name, "spasi-bg-v13");
        assert_eq!(config.precache, vec!["/", "/index.html", "/manifest.json", "/icon-192.png", "/icon-512.png"]);
        assert_eq!(config.root_url, "/");
        assert_eq!(config.db_path, PathBuf::from("./spasi-sw-cache.sqlite"));
        assert_eq!(config.timeout_ms, 20_000);
        assert!(config.skip_waiting);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_worker_config_compiles_patterns() {
        let worker = AppConfig::default().worker_config().unwrap();
        assert_eq!(worker.bypass.len(), 1);
        assert_eq!(worker.network_first.len(), 2);
        assert!(worker.bypass[0].is_match("https://cdn.OneSignal.com/sdks/page.js"));
    }

    #[test]
    fn test_worker_config_rejects_bad_pattern() {
        let config = AppConfig { bypass_patterns: vec!["(unclosed".into()], ..Default::default() };
        let result = config.worker_config();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "bypass_patterns"));
    }

    #[test]
    fn test_push_marker_lowercased() {
        let config = AppConfig { push_sdk_marker: "OneSignal".into(), ..Default::default() };
        assert_eq!(config.worker_config().unwrap().push_sdk_marker, "onesignal");
    }

    #[test]
    fn test_key_for_canonical_url() {
        let worker = AppConfig::default().worker_config().unwrap();
        let key = worker.key_for(&Request::navigate("http://localhost:5173/index.html#top"));
        assert_eq!(key, RequestKey::get("/index.html"));
    }

    #[test]
    fn test_with_cache_name() {
        let worker = AppConfig::default().worker_config().unwrap().with_cache_name("spasi-bg-v14");
        assert_eq!(worker.cache_name, "spasi-bg-v14");
    }
}
