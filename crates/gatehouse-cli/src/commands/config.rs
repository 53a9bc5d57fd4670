//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use gatehouse_core::config::AppConfig;
use gatehouse_core::error::AppError;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration (secret masked)
    Show,
    /// Validate configuration file
    Validate,
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let config = masked(super::load_config(config_path)?);
            output::print_item(&config, format);
        }
        ConfigCommand::Validate => match super::load_config(config_path) {
            Ok(config) => {
                output::print_success(&format!("Configuration '{}' is valid", config_path));
                output::print_kv(
                    "Server",
                    &format!("{}:{}", config.server.host, config.server.port),
                );
                output::print_kv(
                    "Policy",
                    &format!("{:?} ({})", config.policy.backend, config.policy.policy_path),
                );
                output::print_kv("Discovery", &format!("{:?}", config.discovery.provider));
                output::print_kv("Routes", &config.gateway.routes.len().to_string());
                if config.auth.uses_default_secret() {
                    output::print_warning("auth.jwt_secret is still the shipped default");
                }
            }
            Err(e) => {
                output::print_error(&format!("Configuration invalid: {}", e));
                return Err(e);
            }
        },
    }

    Ok(())
}

fn masked(mut config: AppConfig) -> AppConfig {
    config.auth.jwt_secret = "****".to_string();
    config
}
