//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dispatcher.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::routing::rule::{HeaderMatchMode, HeaderRule, RuleError};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Route definitions, in declaration order.
    pub routes: Vec<RouteConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Route configuration mapping requests to a cluster.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics. Unique within a config.
    pub name: String,

    /// Host header to match (exact match).
    #[serde(default)]
    pub host: Option<String>,

    /// Path prefix to match.
    #[serde(default)]
    pub path_prefix: Option<String>,

    /// Destination cluster name.
    pub cluster: String,

    /// Route priority (higher = preferred).
    #[serde(default)]
    pub priority: u32,

    /// Required headers. All must match.
    #[serde(default)]
    pub headers: Vec<HeaderRuleConfig>,
}

/// One required-header rule as written in the config file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HeaderRuleConfig {
    pub name: String,

    #[serde(default)]
    pub values: Vec<String>,

    #[serde(default)]
    pub mode: HeaderMatchMode,

    #[serde(default)]
    pub case_sensitive: bool,
}

impl HeaderRuleConfig {
    /// Validate and build the runtime rule.
    pub fn build(&self) -> Result<HeaderRule, RuleError> {
        HeaderRule::new(
            self.name.clone(),
            self.values.clone(),
            self.mode,
            self.case_sensitive,
        )
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
