//! HTTP middleware.

pub mod cache_control;

pub use cache_control::{cache_control_middleware, CacheControlState};
