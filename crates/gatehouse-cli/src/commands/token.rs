//! Token CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use gatehouse_auth::TokenCodec;
use gatehouse_core::error::AppError;
use gatehouse_core::types::SubjectId;

/// Arguments for token commands
#[derive(Debug, Args)]
pub struct TokenArgs {
    /// Token subcommand
    #[command(subcommand)]
    pub command: TokenCommand,
}

/// Token subcommands
#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Issue a token signed with the configured secret
    Issue {
        /// Subject identifier (the policy subject)
        #[arg(short, long)]
        subject: String,
        /// Username claim
        #[arg(short, long)]
        username: String,
        /// Email claim
        #[arg(short, long, default_value = "")]
        email: String,
    },
    /// Verify a token and print its claims
    Verify {
        /// Encoded token
        token: String,
    },
}

/// Issued token for output
#[derive(Debug, Serialize, Tabled)]
struct IssuedRow {
    /// Token
    token: String,
    /// Expires at
    expires_at: String,
}

/// Claim display row for table output
#[derive(Debug, Serialize, Tabled)]
struct ClaimsRow {
    /// Subject
    user_id: String,
    /// Username
    username: String,
    /// Email
    email: String,
    /// Issuer
    iss: String,
    /// Issued at
    issued_at: String,
    /// Expires at
    expires_at: String,
    /// Token ID
    jti: String,
}

/// Execute token commands
pub async fn execute(
    args: &TokenArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let codec = TokenCodec::new(&config.auth);

    match &args.command {
        TokenCommand::Issue {
            subject,
            username,
            email,
        } => {
            let token = codec.issue(&SubjectId::new(subject.as_str()), username, email)?;
            let claims = codec.verify(&token)?;
            let row = IssuedRow {
                token,
                expires_at: format_epoch(claims.exp),
            };
            output::print_list(&[row], format);
        }
        TokenCommand::Verify { token } => {
            let claims = codec.verify(token)?;
            let row = ClaimsRow {
                user_id: claims.user_id.to_string(),
                username: claims.username.clone(),
                email: claims.email.clone(),
                iss: claims.iss.clone(),
                issued_at: format_epoch(claims.iat),
                expires_at: format_epoch(claims.exp),
                jti: claims.jti.to_string(),
            };
            output::print_list(&[row], format);
        }
    }

    Ok(())
}

fn format_epoch(seconds: i64) -> String {
    chrono::DateTime::from_timestamp(seconds, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| seconds.to_string())
}
