//! Token signing configuration.

use serde::{Deserialize, Serialize};

/// Placeholder secret shipped in the defaults.
pub const DEFAULT_JWT_SECRET: &str = "CHANGE_ME_IN_PRODUCTION";

/// Authentication token configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT signing (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Value of the `iss` claim on issued tokens.
    #[serde(default = "default_issuer")]
    pub jwt_issuer: String,
    /// Token lifetime in hours.
    #[serde(default = "default_ttl_hours")]
    pub jwt_ttl_hours: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            jwt_issuer: default_issuer(),
            jwt_ttl_hours: default_ttl_hours(),
        }
    }
}

impl AuthConfig {
    /// Whether the signing secret was never changed from the placeholder.
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}

fn default_issuer() -> String {
    "gatehouse".to_string()
}

fn default_ttl_hours() -> u64 {
    24
}
