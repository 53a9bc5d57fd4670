//! Access pipeline configuration.

use serde::{Deserialize, Serialize};

/// Where the forward-auth endpoint reads the (resource, action) pair from.
///
/// Routes served or proxied by Gatehouse itself are always checked against
/// their own path and method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSource {
    /// The request URI path and HTTP method.
    #[default]
    Request,
    /// `X-Request-Path` / `X-Original-URI` and `X-Request-Method` /
    /// `X-HTTP-Method` headers set by an upstream proxy. When they are
    /// absent the authorization stage is skipped.
    Headers,
}

/// Authentication/authorization pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Paths that bypass both authentication and authorization.
    #[serde(default = "default_skip_paths")]
    pub skip_paths: Vec<String>,
    /// Source of the authorization target.
    #[serde(default)]
    pub target_source: TargetSource,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            skip_paths: default_skip_paths(),
            target_source: TargetSource::default(),
        }
    }
}

fn default_skip_paths() -> Vec<String> {
    vec![
        "/health".to_string(),
        "/v1/auth/login".to_string(),
        "/v1/auth/register".to_string(),
        "/v1/auth/refresh".to_string(),
        "/v1/errors".to_string(),
    ]
}
