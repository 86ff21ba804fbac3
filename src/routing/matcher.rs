//! Route matching logic.
//!
//! # Responsibilities
//! - Evaluate one header rule against the values a request presented
//! - Decide route eligibility by ANDing its header rules (fail-fast)
//! - Match host header (exact match, case-insensitive, port ignored)
//! - Match path prefix (case-sensitive)
//!
//! # Design Decisions
//! - Pure functions over borrowed inputs: no locks, no allocation on the
//!   common path, safe to call from any number of tasks at once
//! - A header sent more than once never satisfies a value-mode rule;
//!   sub-values inside one header value are not split
//! - Missing or empty headers are ordinary non-matches, never errors

use std::borrow::Cow;

use axum::http::{header::ValueIter, HeaderMap, HeaderValue, Request};

use crate::routing::rule::{HeaderMatchMode, HeaderRule, HeaderRuleSet};

/// Per-request header lookup.
///
/// Returns every raw value the request carried for `name`, in the order
/// received. Name lookup is case-insensitive.
pub trait HeaderSource {
    type Values<'a>: Iterator<Item = Cow<'a, str>>
    where
        Self: 'a;

    fn header_values<'a>(&'a self, name: &'a str) -> Self::Values<'a>;
}

type LossyValue<'a> = fn(&'a HeaderValue) -> Cow<'a, str>;

fn lossy(value: &HeaderValue) -> Cow<'_, str> {
    String::from_utf8_lossy(value.as_bytes())
}

impl HeaderSource for HeaderMap {
    type Values<'a> = std::iter::Map<ValueIter<'a, HeaderValue>, LossyValue<'a>>;

    fn header_values<'a>(&'a self, name: &'a str) -> Self::Values<'a> {
        self.get_all(name).into_iter().map(lossy as LossyValue<'a>)
    }
}

impl<B> HeaderSource for Request<B> {
    type Values<'a> = <HeaderMap as HeaderSource>::Values<'a>
    where
        Self: 'a;

    fn header_values<'a>(&'a self, name: &'a str) -> Self::Values<'a> {
        self.headers().header_values(name)
    }
}

/// Plain name/value pairs, for callers that don't hold an `http::HeaderMap`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<(String, String)>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one header entry. Repeating a name adds another entry.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderList {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect(),
        }
    }
}

/// Iterator over the values of one name in a [`HeaderList`].
pub struct HeaderListValues<'a> {
    entries: std::slice::Iter<'a, (String, String)>,
    name: &'a str,
}

impl<'a> Iterator for HeaderListValues<'a> {
    type Item = Cow<'a, str>;

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.name;
        self.entries
            .by_ref()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| Cow::Borrowed(v.as_str()))
    }
}

impl HeaderSource for HeaderList {
    type Values<'a> = HeaderListValues<'a>;

    fn header_values<'a>(&'a self, name: &'a str) -> Self::Values<'a> {
        HeaderListValues {
            entries: self.entries.iter(),
            name,
        }
    }
}

/// Returns true if `values` (everything the request sent for `rule.name()`)
/// satisfies `rule`.
///
/// Only the first two values are inspected for value-mode rules: a second
/// entry is enough to reject the match.
pub fn header_matches<I, S>(values: I, rule: &HeaderRule) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut values = values.into_iter();
    let first = match values.next() {
        Some(v) => v,
        None => return false,
    };

    match values.next() {
        None => {
            let value = first.as_ref();
            if value.is_empty() {
                return false;
            }
            match rule.mode() {
                HeaderMatchMode::Exists => true,
                HeaderMatchMode::ExactHeader => rule
                    .values()
                    .iter()
                    .any(|accepted| equals(value, accepted, rule.is_case_sensitive())),
                HeaderMatchMode::HeaderPrefix => rule
                    .values()
                    .iter()
                    .any(|accepted| starts_with(value, accepted, rule.is_case_sensitive())),
            }
        }
        // Repeated header: only presence can be judged.
        Some(second) => {
            rule.mode() == HeaderMatchMode::Exists
                && (!first.as_ref().is_empty()
                    || !second.as_ref().is_empty()
                    || values.any(|v| !v.as_ref().is_empty()))
        }
    }
}

/// Returns true if every rule in `rules` is satisfied by `headers`.
///
/// Rules are evaluated in declaration order and the first failure ends the
/// evaluation. An empty rule set is always eligible.
pub fn is_eligible<H>(headers: &H, rules: &HeaderRuleSet) -> bool
where
    H: HeaderSource + ?Sized,
{
    rules.iter().all(|rule| {
        let matched = header_matches(headers.header_values(rule.name()), rule);
        if !matched {
            tracing::trace!(header = rule.name(), mode = %rule.mode(), "Header rule not satisfied");
        }
        matched
    })
}

fn equals(value: &str, accepted: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        value == accepted
    } else if value.is_ascii() && accepted.is_ascii() {
        value.eq_ignore_ascii_case(accepted)
    } else {
        value.chars().map(fold).eq(accepted.chars().map(fold))
    }
}

fn starts_with(value: &str, prefix: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        value.starts_with(prefix)
    } else if value.is_ascii() && prefix.is_ascii() {
        value.len() >= prefix.len()
            && value.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
    } else {
        let mut folded = value.chars().map(fold);
        prefix.chars().all(|c| folded.next() == Some(fold(c)))
    }
}

/// Simple one-to-one uppercase mapping. A char whose uppercase form is
/// several chars (e.g. `ß`) maps to itself.
fn fold(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

/// Matches the Host header.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// The host is normalized to lowercase for case-insensitive matching.
    /// A port in the configured host is dropped, as it is on the request side.
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            expected_host: strip_port(&host).to_ascii_lowercase(),
        }
    }

    pub fn host(&self) -> &str {
        &self.expected_host
    }

    pub fn matches(&self, host: Option<&str>) -> bool {
        host.map(strip_port)
            .map(|h| h.eq_ignore_ascii_case(&self.expected_host))
            .unwrap_or(false)
    }
}

fn strip_port(host: &str) -> &str {
    let host = host.trim();
    if host.starts_with('[') {
        // IPv6 literal: keep everything up to the closing bracket.
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split(':').next().unwrap_or(host)
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn exact(values: &[&str], case_sensitive: bool) -> HeaderRule {
        HeaderRule::exact("X", values.iter().copied(), case_sensitive).unwrap()
    }

    fn prefix(values: &[&str], case_sensitive: bool) -> HeaderRule {
        HeaderRule::prefix("X", values.iter().copied(), case_sensitive).unwrap()
    }

    fn exists() -> HeaderRule {
        HeaderRule::exists("X").unwrap()
    }

    #[test]
    fn test_exact_case_insensitive() {
        assert!(header_matches(["foo"], &exact(&["foo"], false)));
        assert!(header_matches(["foo"], &exact(&["FOO"], false)));
        assert!(!header_matches(["foo"], &exact(&["FOO"], true)));
        assert!(header_matches(["FOO"], &exact(&["FOO"], true)));
    }

    #[test]
    fn test_prefix_vs_exact() {
        assert!(header_matches(["foobar"], &prefix(&["foo"], false)));
        assert!(!header_matches(["foobar"], &exact(&["foo"], false)));
        assert!(header_matches(["FOObar"], &prefix(&["foo"], false)));
        assert!(!header_matches(["FOObar"], &prefix(&["foo"], true)));
        assert!(!header_matches(["fo"], &prefix(&["foo"], false)));
    }

    #[test]
    fn test_any_accepted_value_suffices() {
        let rule = exact(&["a", "b", "c"], true);
        assert!(header_matches(["b"], &rule));
        assert!(!header_matches(["d"], &rule));

        let rule = prefix(&["v1.", "v2."], true);
        assert!(header_matches(["v2.3"], &rule));
    }

    #[test]
    fn test_repeated_header() {
        assert!(!header_matches(["a", "b"], &exact(&["a"], false)));
        assert!(!header_matches(["a", "b"], &prefix(&["a"], false)));
        assert!(!header_matches(["a", "a"], &exact(&["a"], false)));
        assert!(header_matches(["a", "b"], &exists()));
    }

    #[test]
    fn test_missing_or_empty_header() {
        let none: [&str; 0] = [];
        for rule in [exact(&["a"], false), prefix(&["a"], false), exists()] {
            assert!(!header_matches(none, &rule));
            assert!(!header_matches([""], &rule));
        }
    }

    #[test]
    fn test_comma_separated_values_are_not_split() {
        assert!(!header_matches(["a, b"], &exact(&["a"], false)));
        assert!(header_matches(["a, b"], &prefix(&["a"], false)));
    }

    #[test]
    fn test_non_ascii_case_folding() {
        assert!(header_matches(["ÄPFEL"], &exact(&["äpfel"], false)));
        assert!(!header_matches(["ÄPFEL"], &exact(&["äpfel"], true)));
        assert!(header_matches(["Ärger-frei"], &prefix(&["ä"], false)));
    }

    #[test]
    fn test_case_folding_is_one_char_to_one_char() {
        // Dotted capital I lowercases to two chars; it must not match `i`.
        assert!(!header_matches(["\u{130}stanbul"], &prefix(&["i"], false)));
        assert!(!header_matches(["\u{130}"], &exact(&["i\u{307}"], false)));
        // Kelvin sign is not the letter K.
        assert!(!header_matches(["\u{212A}"], &exact(&["k"], false)));
        assert!(header_matches(["stra\u{df}e"], &exact(&["STRA\u{df}E"], false)));
        assert!(!header_matches(["strasse"], &exact(&["stra\u{df}e"], false)));
    }

    #[test]
    fn test_is_eligible_stops_at_first_failing_rule() {
        use std::cell::RefCell;

        struct Recording {
            inner: HeaderList,
            looked_up: RefCell<Vec<String>>,
        }

        impl HeaderSource for Recording {
            type Values<'a> = HeaderListValues<'a>;

            fn header_values<'a>(&'a self, name: &'a str) -> Self::Values<'a> {
                self.looked_up.borrow_mut().push(name.to_string());
                self.inner.header_values(name)
            }
        }

        let headers = Recording {
            inner: HeaderList::new().with("A", "1").with("C", "3"),
            looked_up: RefCell::new(Vec::new()),
        };
        let rules = HeaderRuleSet::new(vec![
            HeaderRule::exists("A").unwrap(),
            HeaderRule::exists("B").unwrap(),
            HeaderRule::exists("C").unwrap(),
        ]);

        assert!(!is_eligible(&headers, &rules));
        assert_eq!(*headers.looked_up.borrow(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let rule = prefix(&["foo"], false);
        let first = header_matches(["FooBar"], &rule);
        for _ in 0..10 {
            assert_eq!(header_matches(["FooBar"], &rule), first);
        }
    }

    #[test]
    fn test_header_map_source() {
        let req = Request::builder()
            .header("content-type", "Application/JSON")
            .header("x-multi", "a")
            .header("x-multi", "b")
            .body(Body::default())
            .unwrap();

        let ct = HeaderRule::exact("Content-Type", ["application/json"], false).unwrap();
        let multi_exact = HeaderRule::exact("X-Multi", ["a"], false).unwrap();
        let multi_exists = HeaderRule::exists("X-Multi").unwrap();

        assert!(is_eligible(&req, &HeaderRuleSet::new(vec![ct.clone()])));
        assert!(!is_eligible(&req, &HeaderRuleSet::new(vec![multi_exact])));
        assert!(is_eligible(&req, &HeaderRuleSet::new(vec![ct, multi_exists])));
    }

    #[test]
    fn test_is_eligible_requires_all_rules() {
        let headers = HeaderList::new().with("X-Env", "prod").with("x-region", "eu-west");
        let env = HeaderRule::exact("x-env", ["prod"], true).unwrap();
        let region = HeaderRule::prefix("X-Region", ["eu-"], true).unwrap();
        let missing = HeaderRule::exists("Authorization").unwrap();

        assert!(is_eligible(&headers, &HeaderRuleSet::empty()));
        assert!(is_eligible(&headers, &HeaderRuleSet::new(vec![env.clone(), region.clone()])));
        assert!(!is_eligible(&headers, &HeaderRuleSet::new(vec![env, missing, region])));
    }

    #[test]
    fn test_host_matcher() {
        let matcher = HostMatcher::new("example.com");

        assert!(matcher.matches(Some("example.com")));
        assert!(matcher.matches(Some("EXAMPLE.COM"))); // Case insensitive
        assert!(matcher.matches(Some("example.com:8080")));
        assert!(!matcher.matches(Some("other.com")));
        assert!(!matcher.matches(None));

        let with_port = HostMatcher::new("Example.com:8080");
        assert_eq!(with_port.host(), "example.com");
        assert!(with_port.matches(Some("example.com:8080")));
        assert!(with_port.matches(Some("example.com")));

        let v6 = HostMatcher::new("[::1]");
        assert!(v6.matches(Some("[::1]:443")));
    }

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api");

        assert!(matcher.matches("/api/v1"));
        assert!(!matcher.matches("/images"));
        assert!(!matcher.matches("/API/v1"));
    }
}
