//! Rule matching subsystem.
//!
//! # Data Flow
//! ```text
//! Outgoing (request, response) pair
//!     → rule_set.rs (scan rules in registration order)
//!     → matcher.rs (evaluate each rule's predicate)
//!     → Return: first MatchedRule or no match
//!
//! Rule compilation (at startup / reload):
//!     RuleConfig[]
//!     → resolve matcher names via MatcherRegistry
//!     → validate and type header configurations
//!     → freeze as immutable RuleSet
//! ```
//!
//! # Design Decisions
//! - Rules compiled up front, immutable at runtime
//! - Deterministic: same input always matches same rule
//! - First match wins (ordered by registration)

pub mod matcher;
pub mod rule_set;

pub use matcher::{AllOf, FnMatcher, MatchAll, RuleMatcher};
pub use rule_set::{MatchedRule, MatcherRegistry, Rule, RuleSet, RuleSetError, MATCH_ALL};
