//! Header composition: merge or overwrite a rule's configuration into a response.
//!
//! # Responsibilities
//! - Read the caching headers a response already carries
//! - Combine them with a [`HeaderConfiguration`] under its merge policy
//! - Write the canonical result back
//!
//! # Design Decisions
//! - `compose` is pure; only `write_to` touches a header map
//! - Flags are additive/subtractive in both modes, values respect the policy
//! - `private` always evicts `public`
//! - A response never leaves without `public`, `private` or `no-cache`

use std::time::SystemTime;

use axum::http::header::{CACHE_CONTROL, ETAG, LAST_MODIFIED, VARY};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use sha2::{Digest, Sha256};

use crate::cache_control::configuration::HeaderConfiguration;
use crate::cache_control::directive::{DirectiveSet, FlagDirective};

/// Header carrying the TTL a caching reverse proxy should apply.
pub const X_REVERSE_PROXY_TTL: HeaderName = HeaderName::from_static("x-reverse-proxy-ttl");

/// Caching headers present on a response before composition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingHeaderState {
    pub cache_control: DirectiveSet,
    pub vary: Vec<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl ExistingHeaderState {
    /// Collect the caching headers from a header map.
    ///
    /// Multiple `Cache-Control` or `Vary` lines are concatenated. Values that are
    /// not visible ASCII are ignored.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let cache_control = headers
            .get_all(CACHE_CONTROL)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(",");

        let vary = headers
            .get_all(VARY)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            cache_control: DirectiveSet::parse(&cache_control),
            vary,
            etag: header_string(headers, &ETAG),
            last_modified: header_string(headers, &LAST_MODIFIED),
        }
    }
}

fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Final caching headers for a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedResult {
    pub cache_control: DirectiveSet,
    pub vary: Vec<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub reverse_proxy_ttl: Option<u64>,
}

impl ComposedResult {
    /// Write the result into a response's headers, replacing the caching headers.
    pub fn write_to(&self, headers: &mut HeaderMap) {
        set_header(headers, CACHE_CONTROL, &self.cache_control.to_header_value());

        if self.vary.is_empty() {
            headers.remove(VARY);
        } else {
            set_header(headers, VARY, &self.vary.join(", "));
        }

        if let Some(etag) = &self.etag {
            set_header(headers, ETAG, etag);
        }
        if let Some(last_modified) = &self.last_modified {
            set_header(headers, LAST_MODIFIED, last_modified);
        }
        if let Some(ttl) = self.reverse_proxy_ttl {
            headers.insert(X_REVERSE_PROXY_TTL, HeaderValue::from(ttl));
        }
    }
}

fn set_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => {
            tracing::warn!(header = %name, value = %value, "Skipping invalid header value");
        }
    }
}

/// Quoted SHA-256 of the body, suitable as a strong ETag.
pub fn content_etag(body: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(body)))
}

/// Computes final caching headers from a rule configuration and a response.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderComposer;

impl HeaderComposer {
    pub fn new() -> Self {
        Self
    }

    /// Combine `config` with the `existing` headers.
    pub fn compose(
        &self,
        config: &HeaderConfiguration,
        existing: &ExistingHeaderState,
        body: &[u8],
    ) -> ComposedResult {
        compose_with(config, existing, Some(body))
    }

    /// Compose against the headers in `headers` and write the result back.
    pub fn apply(&self, config: &HeaderConfiguration, headers: &mut HeaderMap, body: &[u8]) -> ComposedResult {
        let existing = ExistingHeaderState::from_headers(headers);
        let result = self.compose(config, &existing, body);
        result.write_to(headers);
        result
    }

    /// Like [`apply`](Self::apply) for a response whose body was not buffered.
    ///
    /// No ETag is computed; an existing one is kept.
    pub fn apply_without_body(&self, config: &HeaderConfiguration, headers: &mut HeaderMap) -> ComposedResult {
        let existing = ExistingHeaderState::from_headers(headers);
        let result = compose_with(config, &existing, None);
        result.write_to(headers);
        result
    }
}

fn compose_with(config: &HeaderConfiguration, existing: &ExistingHeaderState, body: Option<&[u8]>) -> ComposedResult {
    ComposedResult {
        cache_control: compose_directives(config, &existing.cache_control),
        vary: compose_vary(config, &existing.vary),
        etag: compose_etag(config, existing.etag.as_deref(), body),
        last_modified: compose_last_modified(config, existing.last_modified.as_deref()),
        reverse_proxy_ttl: config.reverse_proxy_ttl,
    }
}

fn compose_directives(config: &HeaderConfiguration, existing: &DirectiveSet) -> DirectiveSet {
    let mut directives = existing.clone();

    for (&directive, &seconds) in &config.values {
        if config.overwrite || !directives.contains_value(directive) {
            directives.insert_value(directive, seconds);
        }
    }

    for (&directive, &enabled) in &config.flags {
        if enabled {
            directives.insert_flag(directive);
        } else {
            directives.remove(directive.name());
        }
    }

    if directives.contains_flag(FlagDirective::Private) {
        directives.remove(FlagDirective::Public.name());
    }

    let has_marker = [FlagDirective::Public, FlagDirective::Private, FlagDirective::NoCache]
        .into_iter()
        .any(|d| directives.contains_flag(d));
    if !has_marker {
        directives.insert_flag(FlagDirective::Private);
    }

    directives
}

fn compose_vary(config: &HeaderConfiguration, existing: &[String]) -> Vec<String> {
    let candidates: Vec<&String> = if config.overwrite && !config.vary.is_empty() {
        config.vary.iter().collect()
    } else {
        existing.iter().chain(config.vary.iter()).collect()
    };

    let mut vary: Vec<String> = Vec::with_capacity(candidates.len());
    for header in candidates {
        if !vary.iter().any(|v| v.eq_ignore_ascii_case(header)) {
            vary.push(header.clone());
        }
    }
    vary
}

fn compose_etag(config: &HeaderConfiguration, existing: Option<&str>, body: Option<&[u8]>) -> Option<String> {
    match (existing, body) {
        (Some(etag), _) if !(config.etag && config.overwrite) => Some(etag.to_string()),
        (_, Some(body)) if config.etag => Some(content_etag(body)),
        (current, _) => current.map(str::to_string),
    }
}

fn compose_last_modified(config: &HeaderConfiguration, existing: Option<&str>) -> Option<String> {
    match (existing, config.last_modified) {
        (Some(current), _) if !config.overwrite => Some(current.to_string()),
        (_, Some(configured)) => Some(httpdate::fmt_http_date(SystemTime::from(configured))),
        (current, None) => current.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_control::directive::ValueDirective;
    use chrono::{TimeZone, Utc};

    fn full_rule() -> HeaderConfiguration {
        HeaderConfiguration::new()
            .with_value(ValueDirective::MaxAge, 900)
            .with_value(ValueDirective::SMaxage, 300)
            .with_flag(FlagDirective::Public, true)
            .with_flag(FlagDirective::Private, false)
            .with_flag(FlagDirective::MustRevalidate, true)
            .with_flag(FlagDirective::ProxyRevalidate, true)
            .with_flag(FlagDirective::NoTransform, true)
            .with_value(ValueDirective::StaleIfError, 300)
            .with_value(ValueDirective::StaleWhileRevalidate, 400)
            .with_vary(["Cookie"])
            .with_etag(true)
            .with_last_modified(Utc.with_ymd_and_hms(2014, 10, 10, 0, 0, 0).unwrap())
    }

    fn preset_response() -> ExistingHeaderState {
        ExistingHeaderState {
            cache_control: DirectiveSet::parse("public, max-age=0, stale-if-error=0"),
            vary: vec!["Encoding".to_string()],
            etag: Some("\"foo\"".to_string()),
            last_modified: Some("Mon, 09 Sep 2013 00:00:00 GMT".to_string()),
        }
    }

    #[test]
    fn test_merge_keeps_existing_state() {
        let result = HeaderComposer::new().compose(&full_rule(), &preset_response(), b"");

        assert_eq!(
            result.cache_control.to_header_value(),
            "max-age=0, must-revalidate, no-transform, proxy-revalidate, public, s-maxage=300, stale-if-error=0, stale-while-revalidate=400"
        );
        assert_eq!(result.vary, vec!["Encoding", "Cookie"]);
        assert_eq!(result.etag.as_deref(), Some("\"foo\""));
        assert_eq!(result.last_modified.as_deref(), Some("Mon, 09 Sep 2013 00:00:00 GMT"));
    }

    #[test]
    fn test_overwrite_replaces_state() {
        let rule = full_rule().overwrite(true);
        let result = HeaderComposer::new().compose(&rule, &preset_response(), b"");

        assert_eq!(
            result.cache_control.to_header_value(),
            "max-age=900, must-revalidate, no-transform, proxy-revalidate, public, s-maxage=300, stale-if-error=300, stale-while-revalidate=400"
        );
        assert_eq!(result.vary, vec!["Cookie"]);
        assert_eq!(result.etag, Some(content_etag(b"")));
        assert_eq!(result.last_modified.as_deref(), Some("Fri, 10 Oct 2014 00:00:00 GMT"));
    }

    #[test]
    fn test_private_evicts_public_in_both_modes() {
        let existing = ExistingHeaderState {
            cache_control: DirectiveSet::parse("public, max-age=60"),
            ..Default::default()
        };
        for overwrite in [false, true] {
            let rule = HeaderConfiguration::new()
                .overwrite(overwrite)
                .with_flag(FlagDirective::Private, true);
            let result = HeaderComposer::new().compose(&rule, &existing, b"");
            assert_eq!(result.cache_control.to_header_value(), "max-age=60, private");
        }
    }

    #[test]
    fn test_private_wins_over_public_in_same_rule() {
        let rule = HeaderConfiguration::new()
            .with_flag(FlagDirective::Public, true)
            .with_flag(FlagDirective::Private, true);
        let result = HeaderComposer::new().compose(&rule, &ExistingHeaderState::default(), b"");
        assert_eq!(result.cache_control.to_header_value(), "private");
    }

    #[test]
    fn test_private_false_keeps_public() {
        let existing = ExistingHeaderState {
            cache_control: DirectiveSet::parse("private, public"),
            ..Default::default()
        };
        let rule = HeaderConfiguration::new().with_flag(FlagDirective::Private, false);
        let result = HeaderComposer::new().compose(&rule, &existing, b"");
        assert_eq!(result.cache_control.to_header_value(), "public");
    }

    #[test]
    fn test_false_flag_removes_existing_directive() {
        let existing = ExistingHeaderState {
            cache_control: DirectiveSet::parse("no-transform, public"),
            ..Default::default()
        };
        let rule = HeaderConfiguration::new().with_flag(FlagDirective::NoTransform, false);
        let result = HeaderComposer::new().compose(&rule, &existing, b"");
        assert_eq!(result.cache_control.to_header_value(), "public");
    }

    #[test]
    fn test_defaults_to_private_without_marker() {
        let rule = HeaderConfiguration::new().with_value(ValueDirective::MaxAge, 60);
        let result = HeaderComposer::new().compose(&rule, &ExistingHeaderState::default(), b"");
        assert_eq!(result.cache_control.to_header_value(), "max-age=60, private");
    }

    #[test]
    fn test_no_cache_alone_is_enough() {
        let result = HeaderComposer::new().compose(
            &HeaderConfiguration::no_cache_fallback(),
            &ExistingHeaderState::default(),
            b"",
        );
        assert_eq!(result.cache_control.to_header_value(), "no-cache");
    }

    #[test]
    fn test_unknown_directives_survive() {
        let existing = ExistingHeaderState {
            cache_control: DirectiveSet::parse("immutable, public"),
            ..Default::default()
        };
        let rule = HeaderConfiguration::new().with_value(ValueDirective::MaxAge, 60);
        let result = HeaderComposer::new().compose(&rule, &existing, b"");
        assert_eq!(result.cache_control.to_header_value(), "immutable, max-age=60, public");
    }

    #[test]
    fn test_vary_deduplicates_case_insensitively() {
        let existing = ExistingHeaderState {
            vary: vec!["Accept-Encoding".to_string(), "Cookie".to_string()],
            ..Default::default()
        };
        let rule = HeaderConfiguration::new().with_vary(["cookie", "Accept-Language", "Accept-Language"]);
        let result = HeaderComposer::new().compose(&rule, &existing, b"");
        assert_eq!(result.vary, vec!["Accept-Encoding", "Cookie", "Accept-Language"]);
    }

    #[test]
    fn test_overwrite_without_vary_keeps_existing_vary() {
        let existing = ExistingHeaderState {
            vary: vec!["Encoding".to_string()],
            ..Default::default()
        };
        let rule = HeaderConfiguration::new().overwrite(true);
        let result = HeaderComposer::new().compose(&rule, &existing, b"");
        assert_eq!(result.vary, vec!["Encoding"]);
    }

    #[test]
    fn test_etag_computed_when_absent() {
        let rule = HeaderConfiguration::new().with_etag(true);
        let result = HeaderComposer::new().compose(&rule, &ExistingHeaderState::default(), b"hello");
        assert_eq!(
            result.etag.as_deref(),
            Some("\"2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824\"")
        );
    }

    #[test]
    fn test_etag_untouched_when_not_requested() {
        let existing = ExistingHeaderState {
            etag: Some("\"v1\"".to_string()),
            ..Default::default()
        };
        let rule = HeaderConfiguration::new().overwrite(true);
        let result = HeaderComposer::new().compose(&rule, &existing, b"body");
        assert_eq!(result.etag.as_deref(), Some("\"v1\""));
    }

    #[test]
    fn test_last_modified_applied_when_absent() {
        let rule = HeaderConfiguration::new()
            .with_last_modified(Utc.with_ymd_and_hms(2003, 7, 13, 0, 0, 0).unwrap());
        let result = HeaderComposer::new().compose(&rule, &ExistingHeaderState::default(), b"");
        assert_eq!(result.last_modified.as_deref(), Some("Sun, 13 Jul 2003 00:00:00 GMT"));
    }

    #[test]
    fn test_write_to_header_map() {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=0"));
        headers.append(VARY, HeaderValue::from_static("Encoding"));

        let rule = HeaderConfiguration::new()
            .with_value(ValueDirective::SMaxage, 120)
            .with_vary(["Cookie"])
            .with_reverse_proxy_ttl(600);
        HeaderComposer::new().apply(&rule, &mut headers, b"");

        assert_eq!(headers[CACHE_CONTROL], "max-age=0, public, s-maxage=120");
        assert_eq!(headers[VARY], "Encoding, Cookie");
        assert_eq!(headers[X_REVERSE_PROXY_TTL], "600");
        assert!(headers.get(ETAG).is_none());
    }

    #[test]
    fn test_merge_keeps_quoted_field_list() {
        let existing = ExistingHeaderState {
            cache_control: DirectiveSet::parse("public, no-cache=\"Set-Cookie, X-Foo\""),
            ..Default::default()
        };
        let rule = HeaderConfiguration::new().with_value(ValueDirective::MaxAge, 60);
        let result = HeaderComposer::new().compose(&rule, &existing, b"");

        assert_eq!(
            result.cache_control.to_header_value(),
            "max-age=60, no-cache=\"Set-Cookie, X-Foo\", public"
        );
    }

    #[test]
    fn test_apply_without_body_skips_etag() {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=5"));

        let rule = HeaderConfiguration::new()
            .with_flag(FlagDirective::Public, true)
            .with_etag(true);
        HeaderComposer::new().apply_without_body(&rule, &mut headers);

        assert_eq!(headers[CACHE_CONTROL], "max-age=5, public");
        assert!(headers.get(ETAG).is_none());

        headers.insert(ETAG, HeaderValue::from_static("\"v1\""));
        let rule = rule.overwrite(true);
        HeaderComposer::new().apply_without_body(&rule, &mut headers);
        assert_eq!(headers[ETAG], "\"v1\"");
    }
}
