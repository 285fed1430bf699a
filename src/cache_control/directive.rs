//! Cache-Control directive vocabulary and the response-side directive set.
//!
//! # Responsibilities
//! - Name the directives a rule may configure, split by kind (flag vs value)
//! - Parse an existing `Cache-Control` header into an ordered set
//! - Serialize a set in canonical order
//!
//! # Design Decisions
//! - Rule-side settings are tagged enums; "not mentioned" is absence from the map,
//!   "ensure absent" is an explicit `false`
//! - The response-side set is keyed by lowercase name so unknown directives
//!   (e.g. `immutable`) survive a merge untouched
//! - `BTreeMap` ordering is the canonical output order (ASCII-lexicographic)

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// A directive that is either present or absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagDirective {
    Public,
    Private,
    MustRevalidate,
    ProxyRevalidate,
    NoTransform,
    NoCache,
    NoStore,
}

impl FlagDirective {
    pub const ALL: [FlagDirective; 7] = [
        FlagDirective::Public,
        FlagDirective::Private,
        FlagDirective::MustRevalidate,
        FlagDirective::ProxyRevalidate,
        FlagDirective::NoTransform,
        FlagDirective::NoCache,
        FlagDirective::NoStore,
    ];

    /// Header spelling of the directive.
    pub fn name(self) -> &'static str {
        match self {
            FlagDirective::Public => "public",
            FlagDirective::Private => "private",
            FlagDirective::MustRevalidate => "must-revalidate",
            FlagDirective::ProxyRevalidate => "proxy-revalidate",
            FlagDirective::NoTransform => "no-transform",
            FlagDirective::NoCache => "no-cache",
            FlagDirective::NoStore => "no-store",
        }
    }
}

impl fmt::Display for FlagDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A directive carrying a number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueDirective {
    MaxAge,
    SMaxage,
    StaleIfError,
    StaleWhileRevalidate,
}

impl ValueDirective {
    pub const ALL: [ValueDirective; 4] = [
        ValueDirective::MaxAge,
        ValueDirective::SMaxage,
        ValueDirective::StaleIfError,
        ValueDirective::StaleWhileRevalidate,
    ];

    /// Header spelling of the directive.
    pub fn name(self) -> &'static str {
        match self {
            ValueDirective::MaxAge => "max-age",
            ValueDirective::SMaxage => "s-maxage",
            ValueDirective::StaleIfError => "stale-if-error",
            ValueDirective::StaleWhileRevalidate => "stale-while-revalidate",
        }
    }
}

impl fmt::Display for ValueDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The Cache-Control directives carried by a response.
///
/// Keys are lowercase directive names; a `None` value is a bare flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveSet {
    entries: BTreeMap<String, Option<String>>,
}

impl DirectiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `Cache-Control` header value.
    ///
    /// Empty segments are ignored and names are lowercased. Values are kept as
    /// written, so a quoted field list such as `no-cache="Set-Cookie, X-Foo"`
    /// serializes back unchanged. A repeated directive keeps its last value.
    pub fn parse(header: &str) -> Self {
        let mut set = Self::new();
        for segment in split_directives(header) {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            match segment.split_once('=') {
                Some((name, value)) => {
                    set.entries
                        .insert(name.trim().to_ascii_lowercase(), Some(value.trim().to_string()));
                }
                None => {
                    set.entries.insert(segment.to_ascii_lowercase(), None);
                }
            }
        }
        set
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn contains_flag(&self, directive: FlagDirective) -> bool {
        self.contains(directive.name())
    }

    pub fn contains_value(&self, directive: ValueDirective) -> bool {
        self.contains(directive.name())
    }

    /// The unquoted value of a directive, `None` when absent or a bare flag.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).and_then(|v| v.as_deref()).map(|v| {
            v.strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(v)
        })
    }

    pub fn insert_flag(&mut self, directive: FlagDirective) {
        self.entries.insert(directive.name().to_string(), None);
    }

    pub fn insert_value(&mut self, directive: ValueDirective, seconds: u64) {
        self.entries
            .insert(directive.name().to_string(), Some(seconds.to_string()));
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Canonical header value: sorted by name, joined by `", "`.
    pub fn to_header_value(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| match value {
                Some(value) => format!("{}={}", name, value),
                None => name.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Split a header on commas outside quoted strings.
fn split_directives(header: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (i, c) in header.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ',' if !quoted => {
                segments.push(&header[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&header[start..]);
    segments
}

impl fmt::Display for DirectiveSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}
