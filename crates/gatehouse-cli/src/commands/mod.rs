//! CLI command definitions and dispatch.

pub mod config;
pub mod policy;
pub mod token;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use gatehouse_core::config::AppConfig;
use gatehouse_core::error::AppError;

/// Gatehouse: authorization gateway administration
#[derive(Debug, Parser)]
#[command(name = "gatehouse", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Issue and inspect tokens
    Token(token::TokenArgs),
    /// Query and edit the policy file
    Policy(policy::PolicyArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Token(args) => token::execute(args, &self.config, self.format).await,
            Commands::Policy(args) => policy::execute(args, &self.config, self.format).await,
            Commands::Config(args) => config::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load_file(config_path)
}
