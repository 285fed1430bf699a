//! HTTP integration subsystem.
//!
//! # Data Flow
//! ```text
//! Handler response
//!     → middleware/cache_control.rs (buffer body, keep request head)
//!     → listener.rs (method gate, skip flag, rule lookup, debug header)
//!     → cache_control::HeaderComposer (merge / overwrite)
//!     → Send to client
//! ```

pub mod listener;
pub mod middleware;
pub mod server;

pub use listener::{request_head, CacheControlListener, Decision};
pub use middleware::{cache_control_middleware, CacheControlState};
pub use server::HttpServer;
