//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! CacheControlListener decisions:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (decision counters)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Metrics are cheap (atomic increments) and no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
