//! Header-aware route dispatch for a reverse proxy.
//!
//! Given a request and the routes whose host and path already match, decide
//! which routes remain eligible under their required-header rules and which
//! eligible route is the most specific.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{HeaderRule, HeaderRuleSet, RouteTable, SharedRouteTable};
