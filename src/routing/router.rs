//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Enumerate host/path candidates for a request
//! - Clear candidates whose header rules fail
//! - Pick the single most specific eligible route, or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) candidate scan (acceptable for typical route counts)
//! - A route with malformed header rules is rejected alone; the rest build
//! - Rebuilds reuse unchanged routes so reload diffs stay cheap to compute

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::http::{header, Request};
use thiserror::Error;

use crate::config::schema::RouteConfig;
use crate::routing::matcher::{is_eligible, HeaderSource, HostMatcher, PathPrefixMatcher};
use crate::routing::rule::{rules_equal, HeaderRuleSet, RuleError};
use crate::routing::specificity::compare_specificity;

/// Errors raised while building a single route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteBuildError {
    #[error("route `{route}`: header rule #{index}: {source}")]
    InvalidHeaderRule {
        route: String,
        index: usize,
        #[source]
        source: RuleError,
    },
}

impl RouteBuildError {
    pub fn route(&self) -> &str {
        match self {
            RouteBuildError::InvalidHeaderRule { route, .. } => route,
        }
    }
}

/// A compiled, immutable route.
#[derive(Debug)]
pub struct Route {
    name: String,
    host: Option<HostMatcher>,
    path_prefix: Option<PathPrefixMatcher>,
    cluster: String,
    priority: u32,
    headers: HeaderRuleSet,
}

impl Route {
    /// Compile a route definition, validating its header rules.
    pub fn from_config(config: &RouteConfig) -> Result<Self, RouteBuildError> {
        let headers = config
            .headers
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                rule.build().map_err(|source| RouteBuildError::InvalidHeaderRule {
                    route: config.name.clone(),
                    index,
                    source,
                })
            })
            .collect::<Result<HeaderRuleSet, _>>()?;

        Ok(Self {
            name: config.name.clone(),
            host: config.host.as_deref().map(HostMatcher::new),
            path_prefix: config.path_prefix.as_deref().map(PathPrefixMatcher::new),
            cluster: config.cluster.clone(),
            priority: config.priority,
            headers,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_ref().map(HostMatcher::host)
    }

    pub fn path_prefix(&self) -> Option<&str> {
        self.path_prefix.as_ref().map(PathPrefixMatcher::prefix)
    }

    pub fn headers(&self) -> &HeaderRuleSet {
        &self.headers
    }

    /// Host and path conditions, the part matched before header rules.
    pub fn matches_location(&self, host: Option<&str>, path: &str) -> bool {
        self.host.as_ref().map_or(true, |m| m.matches(host))
            && self.path_prefix.as_ref().map_or(true, |m| m.matches(path))
    }

    /// True when both routes would dispatch identically.
    pub fn same_definition(&self, other: &Route) -> bool {
        self.name == other.name
            && self.host() == other.host()
            && self.path_prefix() == other.path_prefix()
            && self.cluster == other.cluster
            && self.priority == other.priority
            && rules_equal(self.headers.as_slice(), other.headers.as_slice())
    }

    fn path_len(&self) -> usize {
        self.path_prefix().map_or(0, str::len)
    }
}

/// A route under consideration for one request.
#[derive(Debug, Clone)]
pub struct Candidate<'t> {
    pub route: &'t Arc<Route>,
    /// Declaration index in the table; the last-resort tie-break.
    pub ordinal: usize,
    pub eligible: bool,
}

/// Orders two candidates by preference. `Greater` means `a` wins.
///
/// Priority, then longer path prefix, then host-specific, then header
/// specificity, then earlier declaration.
pub fn compare_candidates(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    let (ra, rb) = (a.route, b.route);
    ra.priority
        .cmp(&rb.priority)
        .then_with(|| ra.path_len().cmp(&rb.path_len()))
        .then_with(|| ra.host.is_some().cmp(&rb.host.is_some()))
        .then_with(|| compare_specificity(&ra.headers, &rb.headers))
        .then_with(|| b.ordinal.cmp(&a.ordinal))
}

/// Clear `eligible` on every candidate whose header rules fail.
pub fn apply_header_rules<H>(candidates: &mut [Candidate<'_>], headers: &H)
where
    H: HeaderSource + ?Sized,
{
    for candidate in candidates.iter_mut().filter(|c| c.eligible) {
        if !is_eligible(headers, candidate.route.headers()) {
            candidate.eligible = false;
        }
    }
}

/// The best eligible candidate, if any.
pub fn pick_best<'t>(candidates: &[Candidate<'t>]) -> Option<&'t Arc<Route>> {
    candidates
        .iter()
        .filter(|c| c.eligible)
        .max_by(|a, b| compare_candidates(a, b))
        .map(|c| c.route)
}

/// Names of routes that changed between two table builds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
    pub unchanged: Vec<String>,
}

impl RouteDiff {
    /// True when the new table dispatches exactly like the previous one.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Outcome of building a route table.
#[derive(Debug)]
pub struct BuildReport {
    pub table: RouteTable,
    pub rejected: Vec<RouteBuildError>,
    pub diff: RouteDiff,
}

/// Immutable, ordered set of compiled routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from scratch.
    pub fn from_config(configs: &[RouteConfig]) -> BuildReport {
        Self::rebuild(&Self::empty(), configs)
    }

    /// Build a table, reusing every route of `previous` whose definition is
    /// unchanged.
    pub fn rebuild(previous: &RouteTable, configs: &[RouteConfig]) -> BuildReport {
        let old: HashMap<&str, &Arc<Route>> =
            previous.routes.iter().map(|r| (r.name(), r)).collect();

        let mut routes = Vec::with_capacity(configs.len());
        let mut rejected = Vec::new();
        let mut diff = RouteDiff::default();

        for config in configs {
            let route = match Route::from_config(config) {
                Ok(route) => route,
                Err(e) => {
                    tracing::error!(route = %config.name, error = %e, "Route rejected");
                    rejected.push(e);
                    continue;
                }
            };

            match old.get(config.name.as_str()) {
                Some(existing) if existing.same_definition(&route) => {
                    diff.unchanged.push(route.name.clone());
                    routes.push(Arc::clone(existing));
                }
                Some(_) => {
                    diff.changed.push(route.name.clone());
                    routes.push(Arc::new(route));
                }
                None => {
                    diff.added.push(route.name.clone());
                    routes.push(Arc::new(route));
                }
            }
        }

        let kept: HashSet<&str> = routes.iter().map(|r| r.name()).collect();
        diff.removed = previous
            .routes
            .iter()
            .map(|r| r.name())
            .filter(|name| !kept.contains(name))
            .map(str::to_string)
            .collect();

        BuildReport {
            table: RouteTable { routes },
            rejected,
            diff,
        }
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Route>> {
        self.routes.iter().find(|r| r.name() == name)
    }

    /// Routes whose host and path conditions hold, all initially eligible.
    pub fn candidates(&self, host: Option<&str>, path: &str) -> Vec<Candidate<'_>> {
        self.routes
            .iter()
            .enumerate()
            .filter(|(_, route)| route.matches_location(host, path))
            .map(|(ordinal, route)| Candidate {
                route,
                ordinal,
                eligible: true,
            })
            .collect()
    }

    /// Candidates with header rules applied.
    pub fn evaluate<H>(&self, host: Option<&str>, path: &str, headers: &H) -> Vec<Candidate<'_>>
    where
        H: HeaderSource + ?Sized,
    {
        let mut candidates = self.candidates(host, path);
        apply_header_rules(&mut candidates, headers);
        candidates
    }

    /// Full dispatch: location, header eligibility, then specificity.
    pub fn select<H>(&self, host: Option<&str>, path: &str, headers: &H) -> Option<&Arc<Route>>
    where
        H: HeaderSource + ?Sized,
    {
        let candidates = self.evaluate(host, path, headers);
        let winner = pick_best(&candidates);
        tracing::trace!(
            path = %path,
            candidates = candidates.len(),
            eligible = candidates.iter().filter(|c| c.eligible).count(),
            route = winner.map(|r| r.name()),
            "Dispatch decision"
        );
        winner
    }

    /// Dispatch an HTTP request. Host comes from the Host header, falling
    /// back to the URI authority.
    pub fn match_request<B>(&self, req: &Request<B>) -> Option<&Arc<Route>> {
        let host = req
            .headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| req.uri().authority().map(|a| a.as_str()));
        self.select(host, req.uri().path(), req)
    }
}
