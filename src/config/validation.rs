//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Turn raw rule headers into a typed [`HeaderConfiguration`]
//! - Validate value ranges (TTLs non-negative, dates parseable, header names legal)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system; request handling never
//!   sees an unvalidated value

use std::net::SocketAddr;

use axum::http::HeaderName;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use crate::cache_control::{FlagDirective, HeaderConfiguration, ValueDirective};
use crate::config::schema::{AppConfig, DirectivesConfig, HeaderConfig, SecondsValue};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("rule {rule}: '{value}' is not a non-negative number of seconds for {field}")]
    InvalidSeconds {
        rule: String,
        field: &'static str,
        value: String,
    },

    #[error("rule {rule}: cannot parse last_modified '{value}'")]
    InvalidLastModified { rule: String, value: String },

    #[error("rule {rule}: '{value}' is not a valid Vary header name")]
    InvalidVaryHeader { rule: String, value: String },

    #[error("rule {rule}: public and private are both enabled")]
    ConflictingVisibility { rule: String },

    #[error("rule {rule}: matcher name is empty")]
    EmptyMatcher { rule: String },

    #[error("debug_header '{0}' is not a valid header name")]
    InvalidDebugHeader(String),

    #[error("{field} '{value}' is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,

    #[error("cache_control.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("unknown log_format '{0}' (expected \"pretty\" or \"json\")")]
    UnknownLogFormat(String),
}

/// Join errors into a single line.
pub fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate a whole configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    let observability = &config.observability;
    if !matches!(observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::UnknownLogFormat(observability.log_format.clone()));
    }
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }

    let cache_control = &config.cache_control;
    if let Some(name) = &cache_control.debug_header {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidDebugHeader(name.clone()));
        }
    }
    if cache_control.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    for (index, rule) in cache_control.rules.iter().enumerate() {
        let label = rule.label(index);
        if rule.matcher.trim().is_empty() {
            errors.push(ValidationError::EmptyMatcher { rule: label.clone() });
        }
        if let Err(rule_errors) = compile_headers(&label, &rule.headers) {
            errors.extend(rule_errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Convert raw rule headers into a typed configuration.
pub fn compile_headers(rule: &str, raw: &HeaderConfig) -> Result<HeaderConfiguration, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut headers = HeaderConfiguration::new().overwrite(raw.overwrite).with_etag(raw.etag);

    for (directive, value) in value_settings(&raw.cache_control) {
        if let Some(value) = value {
            match parse_seconds(value) {
                Some(seconds) => headers = headers.with_value(directive, seconds),
                None => errors.push(ValidationError::InvalidSeconds {
                    rule: rule.to_string(),
                    field: directive_field(directive),
                    value: seconds_text(value),
                }),
            }
        }
    }

    for (directive, enabled) in flag_settings(&raw.cache_control) {
        if let Some(enabled) = enabled {
            headers = headers.with_flag(directive, enabled);
        }
    }

    if raw.cache_control.public == Some(true) && raw.cache_control.private == Some(true) {
        errors.push(ValidationError::ConflictingVisibility { rule: rule.to_string() });
    }

    for name in &raw.vary {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidVaryHeader {
                rule: rule.to_string(),
                value: name.clone(),
            });
        }
    }
    headers.vary = raw.vary.clone();

    if let Some(value) = &raw.last_modified {
        match parse_last_modified(value) {
            Some(date) => headers.last_modified = Some(date),
            None => errors.push(ValidationError::InvalidLastModified {
                rule: rule.to_string(),
                value: value.clone(),
            }),
        }
    }

    if let Some(value) = &raw.reverse_proxy_ttl {
        match parse_seconds(value) {
            Some(seconds) => headers.reverse_proxy_ttl = Some(seconds),
            None => errors.push(ValidationError::InvalidSeconds {
                rule: rule.to_string(),
                field: "reverse_proxy_ttl",
                value: seconds_text(value),
            }),
        }
    }

    if errors.is_empty() {
        Ok(headers)
    } else {
        Err(errors)
    }
}

fn value_settings(raw: &DirectivesConfig) -> [(ValueDirective, Option<&SecondsValue>); 4] {
    [
        (ValueDirective::MaxAge, raw.max_age.as_ref()),
        (ValueDirective::SMaxage, raw.s_maxage.as_ref()),
        (ValueDirective::StaleIfError, raw.stale_if_error.as_ref()),
        (ValueDirective::StaleWhileRevalidate, raw.stale_while_revalidate.as_ref()),
    ]
}

fn flag_settings(raw: &DirectivesConfig) -> [(FlagDirective, Option<bool>); 7] {
    [
        (FlagDirective::Public, raw.public),
        (FlagDirective::Private, raw.private),
        (FlagDirective::MustRevalidate, raw.must_revalidate),
        (FlagDirective::ProxyRevalidate, raw.proxy_revalidate),
        (FlagDirective::NoTransform, raw.no_transform),
        (FlagDirective::NoCache, raw.no_cache),
        (FlagDirective::NoStore, raw.no_store),
    ]
}

fn directive_field(directive: ValueDirective) -> &'static str {
    match directive {
        ValueDirective::MaxAge => "max_age",
        ValueDirective::SMaxage => "s_maxage",
        ValueDirective::StaleIfError => "stale_if_error",
        ValueDirective::StaleWhileRevalidate => "stale_while_revalidate",
    }
}

fn seconds_text(value: &SecondsValue) -> String {
    match value {
        SecondsValue::Number(n) => n.to_string(),
        SecondsValue::Text(s) => s.clone(),
    }
}

/// Parse a TTL given as an integer or a numeric string.
pub fn parse_seconds(value: &SecondsValue) -> Option<u64> {
    match value {
        SecondsValue::Number(n) => u64::try_from(*n).ok(),
        SecondsValue::Text(s) => s.trim().parse().ok(),
    }
}

/// Parse a configured Last-Modified date.
///
/// Accepts HTTP dates, RFC 3339, and `DD.MM.YYYY` / `YYYY-MM-DD` with an optional
/// `HH:MM:SS` and a trailing ` GMT` or ` UTC`. Dates without a zone are UTC.
pub fn parse_last_modified(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(time) = httpdate::parse_http_date(value) {
        return Some(DateTime::<Utc>::from(time));
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date.with_timezone(&Utc));
    }

    let local = value
        .strip_suffix(" GMT")
        .or_else(|| value.strip_suffix(" UTC"))
        .unwrap_or(value)
        .trim();

    for format in ["%Y-%m-%d %H:%M:%S", "%d.%m.%Y %H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(local, format) {
            return Some(datetime.and_utc());
        }
    }
    for format in ["%Y-%m-%d", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(local, format) {
            return date.and_hms_opt(0, 0, 0).map(|datetime| datetime.and_utc());
        }
    }
    None
}
