//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration for the preview server.
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Cache header rules and global flags.
    pub cache_control: CacheControlConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Cache header rules and global flags.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheControlConfig {
    /// Force `Cache-Control: no-cache` on every safe response, ignoring rules.
    pub skip: bool,

    /// Header naming the matched rule on every response (disabled when unset).
    pub debug_header: Option<String>,

    /// Largest response body buffered for ETag computation, in bytes.
    pub max_body_bytes: usize,

    /// Rules, evaluated in order.
    pub rules: Vec<RuleConfig>,
}

impl Default for CacheControlConfig {
    fn default() -> Self {
        Self {
            skip: false,
            debug_header: None,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            rules: Vec::new(),
        }
    }
}

/// A single rule: a named matcher and the headers it applies.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleConfig {
    /// Rule identifier for logging and the debug header.
    #[serde(default)]
    pub name: Option<String>,

    /// Name of a matcher in the application's registry.
    #[serde(default = "default_matcher")]
    pub matcher: String,

    #[serde(default)]
    pub headers: HeaderConfig,
}

impl RuleConfig {
    /// Name of the rule, or its position when unnamed.
    pub fn label(&self, index: usize) -> String {
        self.name.clone().unwrap_or_else(|| format!("#{}", index))
    }
}

fn default_matcher() -> String {
    crate::rules::MATCH_ALL.to_string()
}

/// Headers applied by a rule, before validation.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct HeaderConfig {
    /// Replace existing header values instead of merging.
    pub overwrite: bool,

    pub cache_control: DirectivesConfig,

    /// Header names appended to Vary.
    pub vary: Vec<String>,

    /// Compute an ETag from the response body.
    pub etag: bool,

    /// Fixed Last-Modified date (e.g. "13.07.2003", "2014-10-10 GMT").
    pub last_modified: Option<String>,

    /// Value for the X-Reverse-Proxy-TTL header.
    pub reverse_proxy_ttl: Option<SecondsValue>,
}

/// Cache-Control directives, using underscores in place of hyphens.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct DirectivesConfig {
    pub max_age: Option<SecondsValue>,
    pub s_maxage: Option<SecondsValue>,
    pub stale_if_error: Option<SecondsValue>,
    pub stale_while_revalidate: Option<SecondsValue>,
    pub public: Option<bool>,
    pub private: Option<bool>,
    pub must_revalidate: Option<bool>,
    pub proxy_revalidate: Option<bool>,
    pub no_transform: Option<bool>,
    pub no_cache: Option<bool>,
    pub no_store: Option<bool>,
}

/// A number of seconds, written either as an integer or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SecondsValue {
    Number(i64),
    Text(String),
}
