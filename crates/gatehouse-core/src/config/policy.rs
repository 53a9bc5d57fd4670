//! Policy persistence configuration.

use serde::{Deserialize, Serialize};

/// Where the policy store loads and saves its tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyBackendKind {
    /// The CSV file at `policy_path`.
    #[default]
    File,
    /// The in-memory role/permission catalog, seeded from `policy_path`
    /// at startup and written back to it on persist.
    Catalog,
}

/// Policy store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Persistence backend.
    #[serde(default)]
    pub backend: PolicyBackendKind,
    /// Path to the RBAC model definition.
    #[serde(default = "default_model_path")]
    pub model_path: String,
    /// Path to the CSV policy rule table.
    #[serde(default = "default_policy_path")]
    pub policy_path: String,
    /// Persist after every successful grant/revoke.
    #[serde(default)]
    pub auto_save: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            backend: PolicyBackendKind::default(),
            model_path: default_model_path(),
            policy_path: default_policy_path(),
            auto_save: false,
        }
    }
}

fn default_model_path() -> String {
    "config/rbac_model.conf".to_string()
}

fn default_policy_path() -> String {
    "config/policy.csv".to_string()
}
