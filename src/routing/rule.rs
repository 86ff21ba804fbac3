//! Header rule data model.
//!
//! # Responsibilities
//! - Validate header rules once, when a route is built
//! - Hold rules immutably for the lifetime of a route table snapshot
//! - Provide rule-list equality for reload diffing
//!
//! # Design Decisions
//! - Fields are private: a `HeaderRule` that exists is well-formed
//! - Header names compare case-insensitively, values ordinally
//! - `HeaderRuleSet` owns its storage, so clones never alias the caller's list

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a rule compares the presented header value against its accepted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderMatchMode {
    /// The value must equal one of the accepted values.
    #[default]
    ExactHeader,
    /// The value must start with one of the accepted values.
    HeaderPrefix,
    /// The header must be present with a non-empty value.
    Exists,
}

impl HeaderMatchMode {
    /// True for modes that compare against `values`.
    pub fn requires_values(self) -> bool {
        !matches!(self, HeaderMatchMode::Exists)
    }
}

impl std::fmt::Display for HeaderMatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HeaderMatchMode::ExactHeader => "exact_header",
            HeaderMatchMode::HeaderPrefix => "header_prefix",
            HeaderMatchMode::Exists => "exists",
        };
        f.write_str(s)
    }
}

/// Errors raised while constructing a [`HeaderRule`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("header rule name must not be empty")]
    EmptyName,

    #[error("header rule `{name}` uses mode {mode} but lists no values")]
    MissingValues { name: String, mode: HeaderMatchMode },

    #[error("header rule `{name}` lists an empty value")]
    EmptyValue { name: String },
}

/// A single validated header constraint attached to a route.
#[derive(Debug, Clone)]
pub struct HeaderRule {
    name: String,
    values: Vec<String>,
    mode: HeaderMatchMode,
    case_sensitive: bool,
}

impl HeaderRule {
    /// Build a rule, rejecting malformed input.
    ///
    /// Value-mode rules need at least one value and none of them may be
    /// empty. `Exists` rules drop `values`, so they never affect equality.
    pub fn new(
        name: impl Into<String>,
        values: Vec<String>,
        mode: HeaderMatchMode,
        case_sensitive: bool,
    ) -> Result<Self, RuleError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RuleError::EmptyName);
        }

        let values = if mode.requires_values() {
            if values.is_empty() {
                return Err(RuleError::MissingValues { name, mode });
            }
            if values.iter().any(|v| v.is_empty()) {
                return Err(RuleError::EmptyValue { name });
            }
            values
        } else {
            Vec::new()
        };

        Ok(Self {
            name,
            values,
            mode,
            case_sensitive,
        })
    }

    /// Shorthand for an `ExactHeader` rule.
    pub fn exact<I, S>(name: impl Into<String>, values: I, case_sensitive: bool) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            values.into_iter().map(Into::into).collect(),
            HeaderMatchMode::ExactHeader,
            case_sensitive,
        )
    }

    /// Shorthand for a `HeaderPrefix` rule.
    pub fn prefix<I, S>(name: impl Into<String>, values: I, case_sensitive: bool) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            values.into_iter().map(Into::into).collect(),
            HeaderMatchMode::HeaderPrefix,
            case_sensitive,
        )
    }

    /// Shorthand for an `Exists` rule.
    pub fn exists(name: impl Into<String>) -> Result<Self, RuleError> {
        Self::new(name, Vec::new(), HeaderMatchMode::Exists, false)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn mode(&self) -> HeaderMatchMode {
        self.mode
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }
}

impl PartialEq for HeaderRule {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.mode == other.mode
            && self.case_sensitive == other.case_sensitive
            && self.values == other.values
    }
}

impl Eq for HeaderRule {}

/// Pairwise rule-list equality: same length and every rule equal in order.
pub fn rules_equal(a: &[HeaderRule], b: &[HeaderRule]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

/// Ordered header rules of one route. All rules must hold (AND).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderRuleSet {
    rules: Vec<HeaderRule>,
}

impl HeaderRuleSet {
    pub fn new(rules: Vec<HeaderRule>) -> Self {
        Self { rules }
    }

    /// A rule set with no constraints; matches every request.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HeaderRule> {
        self.rules.iter()
    }

    pub fn as_slice(&self) -> &[HeaderRule] {
        &self.rules
    }

    pub fn into_vec(self) -> Vec<HeaderRule> {
        self.rules
    }
}

impl From<Vec<HeaderRule>> for HeaderRuleSet {
    fn from(rules: Vec<HeaderRule>) -> Self {
        Self::new(rules)
    }
}

impl FromIterator<HeaderRule> for HeaderRuleSet {
    fn from_iter<T: IntoIterator<Item = HeaderRule>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a HeaderRuleSet {
    type Item = &'a HeaderRule;
    type IntoIter = std::slice::Iter<'a, HeaderRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
