//! Policy file CLI commands.
//!
//! Each invocation loads the configured policy file into a fresh
//! [`PolicyStore`], applies one query or mutation, and writes the file back
//! when the rule set changed.

use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use gatehouse_auth::policy::{FilePolicyAdapter, PolicyStore};
use gatehouse_core::config::policy::PolicyConfig;
use gatehouse_core::error::AppError;

/// Arguments for policy commands
#[derive(Debug, Args)]
pub struct PolicyArgs {
    /// Policy subcommand
    #[command(subcommand)]
    pub command: PolicyCommand,
}

/// Policy subcommands
#[derive(Debug, Subcommand)]
pub enum PolicyCommand {
    /// Check whether a subject may perform an action on a resource
    Check {
        subject: String,
        resource: String,
        action: String,
    },
    /// List roles of a subject, including inherited ones
    Roles { subject: String },
    /// List effective permissions of a subject
    Permissions { subject: String },
    /// Grant a role to a subject
    GrantRole { subject: String, role: String },
    /// Revoke a role from a subject
    RevokeRole { subject: String, role: String },
    /// Grant a (resource, action) permission to a role
    Grant {
        role: String,
        resource: String,
        action: String,
    },
    /// Revoke a (resource, action) permission from a role
    Revoke {
        role: String,
        resource: String,
        action: String,
    },
}

/// Check result row
#[derive(Debug, Serialize, Tabled)]
struct CheckRow {
    subject: String,
    resource: String,
    action: String,
    allowed: bool,
}

/// Role row
#[derive(Debug, Serialize, Tabled)]
struct RoleRow {
    role: String,
}

/// Permission row
#[derive(Debug, Serialize, Tabled)]
struct PermissionRow {
    resource: String,
    action: String,
}

/// Execute policy commands
pub async fn execute(
    args: &PolicyArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let store = open_store(&config.policy).await?;

    match &args.command {
        PolicyCommand::Check {
            subject,
            resource,
            action,
        } => {
            let allowed = store.enforce(subject, resource, action)?;
            let row = CheckRow {
                subject: subject.clone(),
                resource: resource.clone(),
                action: action.clone(),
                allowed,
            };
            output::print_list(&[row], format);
        }
        PolicyCommand::Roles { subject } => {
            let rows: Vec<RoleRow> = store
                .roles_of(subject)?
                .into_iter()
                .map(|role| RoleRow { role })
                .collect();
            output::print_list(&rows, format);
        }
        PolicyCommand::Permissions { subject } => {
            let rows: Vec<PermissionRow> = store
                .permissions_of(subject)?
                .into_iter()
                .map(|p| PermissionRow {
                    resource: p.resource,
                    action: p.action,
                })
                .collect();
            output::print_list(&rows, format);
        }
        PolicyCommand::GrantRole { subject, role } => {
            let changed = store.grant_role(subject, role).await?;
            report(&store, changed, &format!("Granted role '{role}' to '{subject}'")).await?;
        }
        PolicyCommand::RevokeRole { subject, role } => {
            let changed = store.revoke_role(subject, role).await?;
            report(&store, changed, &format!("Revoked role '{role}' from '{subject}'")).await?;
        }
        PolicyCommand::Grant {
            role,
            resource,
            action,
        } => {
            let changed = store.grant_permission(role, resource, action).await?;
            let msg = format!("Granted {action} on '{resource}' to '{role}'");
            report(&store, changed, &msg).await?;
        }
        PolicyCommand::Revoke {
            role,
            resource,
            action,
        } => {
            let changed = store.revoke_permission(role, resource, action).await?;
            let msg = format!("Revoked {action} on '{resource}' from '{role}'");
            report(&store, changed, &msg).await?;
        }
    }

    Ok(())
}

/// Loads the configured policy file, validating the model first.
async fn open_store(config: &PolicyConfig) -> Result<PolicyStore, AppError> {
    let adapter =
        FilePolicyAdapter::new(config.policy_path.as_str()).with_model(config.model_path.as_str());
    let store = PolicyStore::new(Arc::new(adapter), false);
    store.load().await?;
    Ok(store)
}

async fn report(store: &PolicyStore, changed: bool, msg: &str) -> Result<(), AppError> {
    if changed {
        store.persist().await?;
        output::print_success(msg);
    } else {
        output::print_warning("No change: the policy already had this state");
    }
    Ok(())
}
