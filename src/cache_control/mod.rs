//! Cache header composition subsystem.
//!
//! # Data Flow
//! ```text
//! Response headers (Cache-Control, Vary, ETag, Last-Modified)
//!     → composer.rs (ExistingHeaderState)
//!     + configuration.rs (HeaderConfiguration of the matched rule)
//!     → composer.rs (merge or overwrite, canonical ordering)
//!     → ComposedResult written back to the response
//! ```
//!
//! # Design Decisions
//! - Directive kinds are a closed vocabulary (directive.rs)
//! - Composition is a pure function of its inputs
//! - Output ordering is deterministic so headers are byte-stable across requests

pub mod composer;
pub mod configuration;
pub mod directive;

pub use composer::{content_etag, ComposedResult, ExistingHeaderState, HeaderComposer, X_REVERSE_PROXY_TTL};
pub use configuration::HeaderConfiguration;
pub use directive::{DirectiveSet, FlagDirective, ValueDirective};
