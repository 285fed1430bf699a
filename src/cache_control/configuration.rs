//! Validated, typed header configuration attached to a rule.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache_control::directive::{FlagDirective, ValueDirective};

/// What a rule asks the composer to do with a response's caching headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderConfiguration {
    /// Replace existing values instead of merging with them.
    pub overwrite: bool,

    /// Flag directives the rule mentions. `false` means "ensure absent".
    pub flags: BTreeMap<FlagDirective, bool>,

    /// Value directives the rule mentions, in seconds.
    pub values: BTreeMap<ValueDirective, u64>,

    /// Header names to vary on. Empty when the rule does not configure Vary.
    pub vary: Vec<String>,

    /// Compute an ETag from the response body.
    pub etag: bool,

    pub last_modified: Option<DateTime<Utc>>,

    /// Value for the `X-Reverse-Proxy-TTL` header.
    pub reverse_proxy_ttl: Option<u64>,
}

impl HeaderConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// The configuration applied when no rule matches.
    pub fn no_cache_fallback() -> Self {
        Self::new().with_flag(FlagDirective::NoCache, true)
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_flag(mut self, directive: FlagDirective, enabled: bool) -> Self {
        self.flags.insert(directive, enabled);
        self
    }

    pub fn with_value(mut self, directive: ValueDirective, seconds: u64) -> Self {
        self.values.insert(directive, seconds);
        self
    }

    pub fn with_vary<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vary = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_etag(mut self, etag: bool) -> Self {
        self.etag = etag;
        self
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    pub fn with_reverse_proxy_ttl(mut self, seconds: u64) -> Self {
        self.reverse_proxy_ttl = Some(seconds);
        self
    }

    /// Setting for a flag directive, `None` when the rule does not mention it.
    pub fn flag(&self, directive: FlagDirective) -> Option<bool> {
        self.flags.get(&directive).copied()
    }

    pub fn value(&self, directive: ValueDirective) -> Option<u64> {
        self.values.get(&directive).copied()
    }
}
