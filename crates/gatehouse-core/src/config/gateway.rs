//! Gateway routing configuration.

use serde::{Deserialize, Serialize};

/// Instance selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Always the first healthy instance.
    #[default]
    First,
    /// Rotate through healthy instances.
    RoundRobin,
    /// Weighted rotation by the `weight` metadata value.
    Weighted,
}

/// A static path-prefix route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Path prefix, e.g. `/v1/user`.
    pub prefix: String,
    /// Target service name in the registry.
    pub service: String,
    /// Remove the prefix before forwarding.
    #[serde(default = "default_true")]
    pub strip_prefix: bool,
}

/// Reverse-proxy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Route table.
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteConfig>,
    /// Instance selection policy.
    #[serde(default)]
    pub selection: SelectionPolicy,
    /// Upstream request timeout in seconds.
    #[serde(default = "default_proxy_timeout")]
    pub proxy_timeout_seconds: u64,
    /// Maximum inbound body size forwarded upstream, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Run the access pipeline in front of proxied routes.
    #[serde(default)]
    pub authenticate: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            routes: default_routes(),
            selection: SelectionPolicy::default(),
            proxy_timeout_seconds: default_proxy_timeout(),
            max_body_bytes: default_max_body_bytes(),
            authenticate: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_routes() -> Vec<RouteConfig> {
    [
        ("/v1/user", "user-service"),
        ("/v1/student", "student-service"),
        ("/v1/rbac", "rbac-service"),
    ]
    .into_iter()
    .map(|(prefix, service)| RouteConfig {
        prefix: prefix.to_string(),
        service: service.to_string(),
        strip_prefix: true,
    })
    .collect()
}

fn default_proxy_timeout() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}
