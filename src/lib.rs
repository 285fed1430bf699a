//! Rule-driven HTTP cache header policy.
//!
//! Matches each outgoing response against an ordered list of rules and writes the
//! resulting `Cache-Control`, `Vary`, `ETag`, `Last-Modified` and
//! `X-Reverse-Proxy-TTL` headers.

pub mod cache_control;
pub mod config;
pub mod http;
pub mod observability;
pub mod rules;

pub use cache_control::{HeaderComposer, HeaderConfiguration};
pub use config::AppConfig;
pub use http::{CacheControlListener, CacheControlState, HttpServer};
pub use rules::{MatcherRegistry, RuleMatcher, RuleSet};
