//! Per-response dispatch of cache header rules.
//!
//! # Responsibilities
//! - Leave unsafe methods untouched
//! - Honour the global skip flag
//! - Pick the first matching rule, or fall back to `no-cache`
//! - Stamp the optional debug header
//!
//! # Design Decisions
//! - Flags are fixed at construction; a reload builds a new listener
//! - No error path at request time: a miss is the `no-cache` fallback

use std::fmt;

use axum::body::Bytes;
use axum::http::header::CACHE_CONTROL;
use axum::http::{HeaderName, HeaderValue, Method, Request, Response};

use crate::cache_control::{HeaderComposer, HeaderConfiguration};
use crate::config::CacheControlConfig;
use crate::observability::metrics;
use crate::rules::{MatcherRegistry, RuleSet, RuleSetError};

/// Debug header value when no rule matched.
pub const NO_MATCH_DIAGNOSTIC: &str = "rule=none";

/// What the listener did with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Request method is neither GET nor HEAD; nothing was touched.
    UnsafeMethod,
    /// The skip flag forced `no-cache`.
    Skipped,
    /// No rule matched; the `no-cache` fallback was applied.
    Fallback,
    /// The rule at this index was applied.
    Matched { index: usize },
}

impl Decision {
    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::UnsafeMethod => "unsafe_method",
            Decision::Skipped => "skipped",
            Decision::Fallback => "fallback",
            Decision::Matched { .. } => "matched",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Matched { index } => write!(f, "matched rule {}", index),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Applies cache header rules to outgoing responses.
#[derive(Debug)]
pub struct CacheControlListener {
    rules: RuleSet,
    composer: HeaderComposer,
    fallback: HeaderConfiguration,
    skip: bool,
    debug_header: Option<HeaderName>,
    max_body_bytes: usize,
}

impl CacheControlListener {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            composer: HeaderComposer::new(),
            fallback: HeaderConfiguration::no_cache_fallback(),
            skip: false,
            debug_header: None,
            max_body_bytes: CacheControlConfig::default().max_body_bytes,
        }
    }

    /// Build a listener from configuration, resolving matchers by name.
    pub fn from_config(config: &CacheControlConfig, registry: &MatcherRegistry) -> Result<Self, RuleSetError> {
        let rules = RuleSet::from_config(&config.rules, registry);
        let debug_header = config
            .debug_header
            .as_ref()
            .map(|name| {
                HeaderName::from_bytes(name.as_bytes()).map_err(|_| RuleSetError::InvalidDebugHeader(name.clone()))
            })
            .transpose();

        let (rules, debug_header) = match (rules, debug_header) {
            (Ok(rules), Ok(debug_header)) => (rules, debug_header),
            (rules, debug_header) => {
                let problems = [rules.err(), debug_header.err()].into_iter().flatten().collect();
                return Err(RuleSetError::collect(problems).unwrap_or(RuleSetError::Multiple(Vec::new())));
            }
        };

        let mut listener = Self::new(rules)
            .with_skip(config.skip)
            .with_max_body_bytes(config.max_body_bytes);
        if let Some(name) = debug_header {
            listener = listener.with_debug_header(name);
        }
        Ok(listener)
    }

    pub fn with_skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_debug_header(mut self, name: HeaderName) -> Self {
        self.debug_header = Some(name);
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn debug_header(&self) -> Option<&HeaderName> {
        self.debug_header.as_ref()
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Only GET and HEAD responses get caching headers.
    pub fn is_cacheable_method(method: &Method) -> bool {
        method == Method::GET || method == Method::HEAD
    }

    /// Apply the rules to `response`.
    pub fn on_response(&self, request: &Request<()>, response: &mut Response<Bytes>) -> Decision {
        self.dispatch(request, response, true)
    }

    /// Apply the rules to a response whose body was not buffered.
    ///
    /// `response` carries the real status and headers with an empty body.
    /// Everything but the ETag is composed as usual.
    pub fn on_unbuffered_response(&self, request: &Request<()>, response: &mut Response<Bytes>) -> Decision {
        self.dispatch(request, response, false)
    }

    fn dispatch(&self, request: &Request<()>, response: &mut Response<Bytes>, buffered: bool) -> Decision {
        let decision = self.decide(request, response, buffered);
        metrics::record_decision(decision.as_str());
        tracing::debug!(
            method = %request.method(),
            path = %request.uri().path(),
            decision = %decision,
            "Cache headers decided"
        );
        decision
    }

    fn decide(&self, request: &Request<()>, response: &mut Response<Bytes>, buffered: bool) -> Decision {
        if !Self::is_cacheable_method(request.method()) {
            return Decision::UnsafeMethod;
        }

        if self.skip {
            response
                .headers_mut()
                .insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            return Decision::Skipped;
        }

        let (decision, headers, diagnostic) = match self.rules.match_rule(request, response) {
            Some(matched) => (
                Decision::Matched { index: matched.index },
                matched.headers(),
                matched.describe(),
            ),
            None => (Decision::Fallback, &self.fallback, NO_MATCH_DIAGNOSTIC.to_string()),
        };

        if buffered {
            let body = response.body().clone();
            self.composer.apply(headers, response.headers_mut(), &body);
        } else {
            self.composer.apply_without_body(headers, response.headers_mut());
        }

        if let Some(name) = &self.debug_header {
            match HeaderValue::try_from(diagnostic) {
                Ok(value) => {
                    response.headers_mut().insert(name.clone(), value);
                }
                Err(_) => {
                    tracing::warn!(header = %name, "Rule name is not a valid header value");
                }
            }
        }

        decision
    }
}

/// Copy the parts of a request that matchers may inspect.
pub fn request_head<B>(request: &Request<B>) -> Request<()> {
    let mut head = Request::new(());
    *head.method_mut() = request.method().clone();
    *head.uri_mut() = request.uri().clone();
    *head.version_mut() = request.version();
    *head.headers_mut() = request.headers().clone();
    head
}
