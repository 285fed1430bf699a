//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, typed header configurations)
//!     → AppConfig (validated, immutable)
//!     → compiled into a CacheControlListener shared via Arc
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → a fresh listener is built and swapped in atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Malformed TTLs and dates are setup-time errors, never request-time ones

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AppConfig, CacheControlConfig, DirectivesConfig, HeaderConfig, ListenerConfig, ObservabilityConfig,
    RuleConfig, SecondsValue, TimeoutConfig,
};
pub use validation::ValidationError;
