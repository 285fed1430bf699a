//! Rule matching contract.
//!
//! # Responsibilities
//! - Define the capability every rule predicate implements
//! - Provide strategy-free building blocks (catch-all, closures, AND)
//!
//! # Design Decisions
//! - Matchers see the request head and the buffered response, read-only
//! - Concrete strategies (path, host, IP) live with the embedding application
//! - `Send + Sync` so a rule set can be shared across request tasks

use std::fmt;

use axum::body::Bytes;
use axum::http::{Request, Response};

/// Decides whether a rule applies to a request/response pair.
pub trait RuleMatcher: Send + Sync + fmt::Debug {
    /// Returns true if the rule applies.
    fn matches(&self, request: &Request<()>, response: &Response<Bytes>) -> bool;
}

/// Matches every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchAll;

impl RuleMatcher for MatchAll {
    fn matches(&self, _request: &Request<()>, _response: &Response<Bytes>) -> bool {
        true
    }
}

/// Adapts a closure into a [`RuleMatcher`].
///
/// The label only shows up in `Debug` output and diagnostics.
pub struct FnMatcher<F> {
    label: String,
    predicate: F,
}

impl<F> FnMatcher<F>
where
    F: Fn(&Request<()>, &Response<Bytes>) -> bool + Send + Sync,
{
    pub fn new(label: impl Into<String>, predicate: F) -> Self {
        Self {
            label: label.into(),
            predicate,
        }
    }
}

impl<F> fmt::Debug for FnMatcher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMatcher").field("label", &self.label).finish()
    }
}

impl<F> RuleMatcher for FnMatcher<F>
where
    F: Fn(&Request<()>, &Response<Bytes>) -> bool + Send + Sync,
{
    fn matches(&self, request: &Request<()>, response: &Response<Bytes>) -> bool {
        (self.predicate)(request, response)
    }
}

/// Combines multiple matchers with AND semantics.
///
/// An empty combination matches everything.
#[derive(Debug)]
pub struct AllOf {
    matchers: Vec<Box<dyn RuleMatcher>>,
}

impl AllOf {
    pub fn new(matchers: Vec<Box<dyn RuleMatcher>>) -> Self {
        Self { matchers }
    }
}

impl RuleMatcher for AllOf {
    fn matches(&self, request: &Request<()>, response: &Response<Bytes>) -> bool {
        self.matchers.iter().all(|m| m.matches(request, response))
    }
}
