//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → routing::RouteTable::from_config
//!
//! On reload:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → RouteTable::rebuild against the live table
//!     → atomic swap in SharedRouteTable
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - A config that fails to load or validate never replaces the live one

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{HeaderRuleConfig, ListenerConfig, ObservabilityConfig, ProxyConfig, RouteConfig};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
