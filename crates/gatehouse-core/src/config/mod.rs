//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section; every field has a default so an empty file is a valid
//! configuration.

pub mod access;
pub mod app;
pub mod auth;
pub mod discovery;
pub mod gateway;
pub mod logging;
pub mod policy;

use serde::{Deserialize, Serialize};

use self::access::AccessConfig;
use self::app::ServerConfig;
use self::auth::AuthConfig;
use self::discovery::DiscoveryConfig;
use self::gateway::GatewayConfig;
use self::logging::LoggingConfig;
use self::policy::PolicyConfig;

use crate::error::AppError;

/// Prefix for environment variable overrides (`GATEHOUSE__AUTH__JWT_SECRET`).
const ENV_PREFIX: &str = "GATEHOUSE";

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Token signing settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Access pipeline settings.
    #[serde(default)]
    pub access: AccessConfig,
    /// Policy persistence settings.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Service discovery settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// Reverse-proxy settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default` with the `config/{env}` overlay and
    /// environment variables prefixed with `GATEHOUSE__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::build(
            config::Config::builder()
                .add_source(config::File::with_name("config/default").required(false))
                .add_source(config::File::with_name(&format!("config/{env}")).required(false)),
        )
    }

    /// Load configuration from a single file plus environment overrides.
    pub fn load_file(path: &str) -> Result<Self, AppError> {
        Self::build(config::Config::builder().add_source(config::File::with_name(path)))
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, AppError> {
        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(AppError::configuration("auth.jwt_secret must not be empty"));
        }
        if self.auth.jwt_ttl_hours == 0 {
            return Err(AppError::configuration("auth.jwt_ttl_hours must be positive"));
        }
        for route in &self.gateway.routes {
            if !route.prefix.starts_with('/') {
                return Err(AppError::configuration(format!(
                    "gateway route prefix '{}' must start with '/'",
                    route.prefix
                )));
            }
            if route.service.is_empty() {
                return Err(AppError::configuration(format!(
                    "gateway route '{}' has no service",
                    route.prefix
                )));
            }
        }
        if self.server.request_timeout_seconds == 0 {
            return Err(AppError::configuration(
                "server.request_timeout_seconds must be positive",
            ));
        }
        if self.discovery.timeout_ms == 0 {
            return Err(AppError::configuration("discovery.timeout_ms must be positive"));
        }
        Ok(())
    }
}
