//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, headers)
//!     → snapshot.rs (take the current table once)
//!     → router.rs (enumerate host/path candidates)
//!     → matcher.rs (clear candidates whose header rules fail)
//!     → specificity.rs + router.rs (rank survivors, pick one)
//!     → Return: matched Route or NoMatch
//!
//! Route Compilation (at startup and on reload):
//!     RouteConfig[]
//!     → rule.rs (validate header rules)
//!     → Reuse unchanged routes from the previous table
//!     → Freeze as immutable RouteTable
//!     → Atomic swap into SharedRouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled ahead of time, immutable at runtime
//! - No regex in hot path (exact/prefix/presence only)
//! - Deterministic: same input always matches same route
//! - Header rules AND together; a rule's values OR together

pub mod matcher;
pub mod router;
pub mod rule;
pub mod snapshot;
pub mod specificity;

pub use matcher::{header_matches, is_eligible, HeaderList, HeaderSource};
pub use router::{BuildReport, Candidate, Route, RouteBuildError, RouteDiff, RouteTable};
pub use rule::{rules_equal, HeaderMatchMode, HeaderRule, HeaderRuleSet, RuleError};
pub use snapshot::{ReloadOutcome, SharedRouteTable, Snapshot};
pub use specificity::compare_specificity;
