//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, Request, Response};

use cache_header_policy::{CacheControlListener, HeaderConfiguration, RuleMatcher, RuleSet};

/// A matcher that returns a fixed answer and counts how often it was asked.
#[derive(Debug)]
pub struct CountingMatcher {
    result: bool,
    calls: Arc<AtomicUsize>,
}

impl CountingMatcher {
    pub fn new(result: bool) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (Self { result, calls: calls.clone() }, calls)
    }
}

impl RuleMatcher for CountingMatcher {
    fn matches(&self, _request: &Request<()>, _response: &Response<Bytes>) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
    }
}

/// A listener whose single rule always matches and applies `headers`.
pub fn listener_with(headers: HeaderConfiguration) -> (CacheControlListener, Arc<AtomicUsize>) {
    let (matcher, calls) = CountingMatcher::new(true);
    let mut rules = RuleSet::new();
    rules.add_rule(matcher, headers);
    (CacheControlListener::new(rules), calls)
}

pub fn request(method: Method) -> Request<()> {
    Request::builder().method(method).uri("/").body(()).unwrap()
}

pub fn get(path: &str) -> Request<()> {
    Request::builder().method(Method::GET).uri(path).body(()).unwrap()
}

pub fn empty_response() -> Response<Bytes> {
    Response::new(Bytes::new())
}

/// Header value as a string, panicking when missing.
pub fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .unwrap_or_else(|| panic!("missing header {name}, have {:?}", headers.keys().collect::<Vec<_>>()))
        .to_str()
        .unwrap()
}

pub fn calls(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}
