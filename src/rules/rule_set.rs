//! Rule lookup and dispatch.
//!
//! # Responsibilities
//! - Store rules in registration order
//! - Return the first rule whose matcher fires, or an explicit no-match
//! - Compile rules from configuration against a matcher registry
//!
//! # Design Decisions
//! - Immutable once built (shared behind `Arc` without locks)
//! - O(n) scan that stops at the first match; later matchers never run
//! - Matchers are resolved by name so strategies stay outside this crate

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{Request, Response};
use thiserror::Error;

use crate::cache_control::HeaderConfiguration;
use crate::config::validation::{compile_headers, format_errors, ValidationError};
use crate::config::RuleConfig;
use crate::rules::matcher::{MatchAll, RuleMatcher};

/// Name under which [`MatchAll`] is registered by default.
pub const MATCH_ALL: &str = "any";

/// Error building a rule set from configuration.
#[derive(Debug, Error)]
pub enum RuleSetError {
    #[error("rule {rule} references unknown matcher '{matcher}'")]
    UnknownMatcher { rule: String, matcher: String },

    #[error("rule {rule} is invalid: {}", format_errors(.errors))]
    InvalidRule {
        rule: String,
        errors: Vec<ValidationError>,
    },

    #[error("invalid debug header name '{0}'")]
    InvalidDebugHeader(String),

    #[error("{}", format_problems(.0))]
    Multiple(Vec<RuleSetError>),
}

impl RuleSetError {
    /// Fold a list of problems into one error, `None` when the list is empty.
    pub fn collect(problems: Vec<RuleSetError>) -> Option<Self> {
        let mut flat: Vec<RuleSetError> = problems
            .into_iter()
            .flat_map(|problem| match problem {
                RuleSetError::Multiple(inner) => inner,
                single => vec![single],
            })
            .collect();
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(RuleSetError::Multiple(flat)),
        }
    }

    /// Every individual problem this error stands for.
    pub fn problems(&self) -> Vec<&RuleSetError> {
        match self {
            RuleSetError::Multiple(inner) => inner.iter().collect(),
            single => vec![single],
        }
    }
}

fn format_problems(problems: &[RuleSetError]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A matcher paired with the headers to apply when it fires.
pub struct Rule {
    name: Option<String>,
    matcher: Arc<dyn RuleMatcher>,
    headers: HeaderConfiguration,
}

impl Rule {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn headers(&self) -> &HeaderConfiguration {
        &self.headers
    }

    pub fn matcher(&self) -> &dyn RuleMatcher {
        self.matcher.as_ref()
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("matcher", &self.matcher)
            .field("overwrite", &self.headers.overwrite)
            .finish()
    }
}

/// The rule that matched a request, with its registration index.
#[derive(Debug, Clone, Copy)]
pub struct MatchedRule<'a> {
    pub index: usize,
    pub rule: &'a Rule,
}

impl<'a> MatchedRule<'a> {
    pub fn headers(&self) -> &'a HeaderConfiguration {
        self.rule.headers()
    }

    /// Short description used in logs and the debug header.
    pub fn describe(&self) -> String {
        match self.rule.name() {
            Some(name) => format!("rule={};name={}", self.index, name),
            None => format!("rule={}", self.index),
        }
    }
}

/// Ordered list of rules; the first match wins.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. Rules are evaluated in the order they are added.
    pub fn add_rule<M>(&mut self, matcher: M, headers: HeaderConfiguration) -> &mut Self
    where
        M: RuleMatcher + 'static,
    {
        self.push(None, Arc::new(matcher), headers)
    }

    /// Append a rule with a name for diagnostics.
    pub fn add_named_rule<M>(
        &mut self,
        name: impl Into<String>,
        matcher: M,
        headers: HeaderConfiguration,
    ) -> &mut Self
    where
        M: RuleMatcher + 'static,
    {
        self.push(Some(name.into()), Arc::new(matcher), headers)
    }

    fn push(
        &mut self,
        name: Option<String>,
        matcher: Arc<dyn RuleMatcher>,
        headers: HeaderConfiguration,
    ) -> &mut Self {
        self.rules.push(Rule {
            name,
            matcher,
            headers,
        });
        self
    }

    /// Find the first rule whose matcher accepts the pair.
    pub fn match_rule(&self, request: &Request<()>, response: &Response<Bytes>) -> Option<MatchedRule<'_>> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matcher.matches(request, response))
            .map(|(index, rule)| MatchedRule { index, rule })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Compile configured rules, resolving matcher names through `registry`.
    ///
    /// Every unknown matcher and invalid rule is reported, not just the first.
    pub fn from_config(configs: &[RuleConfig], registry: &MatcherRegistry) -> Result<Self, RuleSetError> {
        let mut rule_set = Self::new();
        let mut problems = Vec::new();

        for (index, config) in configs.iter().enumerate() {
            let label = config.label(index);
            let matcher = registry.get(&config.matcher);
            if matcher.is_none() {
                problems.push(RuleSetError::UnknownMatcher {
                    rule: label.clone(),
                    matcher: config.matcher.clone(),
                });
            }

            match (matcher, compile_headers(&label, &config.headers)) {
                (Some(matcher), Ok(headers)) => {
                    rule_set.push(config.name.clone(), matcher, headers);
                }
                (_, Err(errors)) => problems.push(RuleSetError::InvalidRule { rule: label, errors }),
                (None, Ok(_)) => {}
            }
        }

        match RuleSetError::collect(problems) {
            Some(err) => Err(err),
            None => Ok(rule_set),
        }
    }
}

/// Named matchers that configuration files can refer to.
#[derive(Debug, Clone)]
pub struct MatcherRegistry {
    matchers: HashMap<String, Arc<dyn RuleMatcher>>,
}

impl MatcherRegistry {
    /// A registry with no matchers, not even [`MATCH_ALL`].
    pub fn empty() -> Self {
        Self {
            matchers: HashMap::new(),
        }
    }

    pub fn register<M>(&mut self, name: impl Into<String>, matcher: M) -> &mut Self
    where
        M: RuleMatcher + 'static,
    {
        self.matchers.insert(name.into(), Arc::new(matcher));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn RuleMatcher>> {
        self.matchers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.matchers.contains_key(name)
    }
}

impl Default for MatcherRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(MATCH_ALL, MatchAll);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_control::{FlagDirective, ValueDirective};
    use crate::config::schema::{DirectivesConfig, HeaderConfig, SecondsValue};
    use crate::rules::matcher::FnMatcher;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Counting {
        result: bool,
        calls: Arc<AtomicUsize>,
    }

    impl RuleMatcher for Counting {
        fn matches(&self, _: &Request<()>, _: &Response<Bytes>) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
        }
    }

    fn pair() -> (Request<()>, Response<Bytes>) {
        (Request::new(()), Response::new(Bytes::new()))
    }

    #[test]
    fn test_first_match_wins_and_short_circuits() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let third = Arc::new(AtomicUsize::new(0));

        let mut rules = RuleSet::new();
        rules
            .add_rule(Counting { result: false, calls: first.clone() }, HeaderConfiguration::new())
            .add_named_rule(
                "second",
                Counting { result: true, calls: second.clone() },
                HeaderConfiguration::new().with_value(ValueDirective::MaxAge, 60),
            )
            .add_rule(Counting { result: true, calls: third.clone() }, HeaderConfiguration::new());

        let (request, response) = pair();
        let matched = rules.match_rule(&request, &response).unwrap();

        assert_eq!(matched.index, 1);
        assert_eq!(matched.headers().value(ValueDirective::MaxAge), Some(60));
        assert_eq!(matched.describe(), "rule=1;name=second");
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(third.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_no_match() {
        let mut rules = RuleSet::new();
        rules.add_rule(
            FnMatcher::new("never", |_: &Request<()>, _: &Response<Bytes>| false),
            HeaderConfiguration::new(),
        );
        let (request, response) = pair();
        assert!(rules.match_rule(&request, &response).is_none());
        assert!(RuleSet::new().match_rule(&request, &response).is_none());
    }

    #[test]
    fn test_from_config() {
        let configs = vec![RuleConfig {
            name: Some("everything".into()),
            matcher: MATCH_ALL.into(),
            headers: HeaderConfig {
                cache_control: DirectivesConfig {
                    max_age: Some(SecondsValue::Text("900".into())),
                    public: Some(true),
                    ..Default::default()
                },
                ..Default::default()
            },
        }];

        let rules = RuleSet::from_config(&configs, &MatcherRegistry::default()).unwrap();
        assert_eq!(rules.len(), 1);

        let (request, response) = pair();
        let matched = rules.match_rule(&request, &response).unwrap();
        assert_eq!(matched.headers().value(ValueDirective::MaxAge), Some(900));
        assert_eq!(matched.headers().flag(FlagDirective::Public), Some(true));
    }

    #[test]
    fn test_from_config_unknown_matcher() {
        let configs = vec![RuleConfig {
            name: None,
            matcher: "static-assets".into(),
            headers: HeaderConfig::default(),
        }];

        let err = RuleSet::from_config(&configs, &MatcherRegistry::default()).unwrap_err();
        assert!(matches!(err, RuleSetError::UnknownMatcher { ref matcher, .. } if matcher == "static-assets"));
        assert_eq!(err.to_string(), "rule #0 references unknown matcher 'static-assets'");
    }

    #[test]
    fn test_from_config_reports_every_problem() {
        let bad_ttl = HeaderConfig {
            reverse_proxy_ttl: Some(SecondsValue::Number(-5)),
            ..Default::default()
        };
        let configs = vec![
            RuleConfig {
                name: Some("assets".into()),
                matcher: "static-assets".into(),
                headers: HeaderConfig::default(),
            },
            RuleConfig {
                name: None,
                matcher: "api".into(),
                headers: HeaderConfig::default(),
            },
            RuleConfig {
                name: Some("proxy".into()),
                matcher: MATCH_ALL.into(),
                headers: bad_ttl,
            },
        ];

        let err = RuleSet::from_config(&configs, &MatcherRegistry::default()).unwrap_err();
        let problems = err.problems();
        assert_eq!(problems.len(), 3);
        assert!(matches!(problems[0], RuleSetError::UnknownMatcher { matcher, .. } if matcher == "static-assets"));
        assert!(matches!(problems[1], RuleSetError::UnknownMatcher { rule, .. } if rule == "#1"));
        assert!(matches!(problems[2], RuleSetError::InvalidRule { rule, .. } if rule == "proxy"));
        assert!(err.to_string().contains("unknown matcher 'api'"));
    }

    #[test]
    fn test_from_config_invalid_headers() {
        let configs = vec![RuleConfig {
            name: Some("broken".into()),
            matcher: MATCH_ALL.into(),
            headers: HeaderConfig {
                cache_control: DirectivesConfig {
                    s_maxage: Some(SecondsValue::Text("soon".into())),
                    ..Default::default()
                },
                ..Default::default()
            },
        }];

        let err = RuleSet::from_config(&configs, &MatcherRegistry::default()).unwrap_err();
        match err {
            RuleSetError::InvalidRule { rule, errors } => {
                assert_eq!(rule, "broken");
                assert_eq!(errors.len(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = MatcherRegistry::empty();
        assert!(!registry.contains(MATCH_ALL));
        registry.register("api", FnMatcher::new("api", |req: &Request<()>, _: &Response<Bytes>| {
            req.uri().path().starts_with("/api")
        }));
        assert!(registry.contains("api"));
        assert!(registry.get("api").is_some());
        assert!(registry.get("missing").is_none());
    }
}
