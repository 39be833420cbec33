// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Workspace commands
//!
//! Commands: create, get, list, status, enable, disable, conflicts

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use workbench_core::application::AddressSpaceConflict;
use workbench_core::domain::resource_template::{ParameterValue, Parameters};
use workbench_core::domain::workspace::{
    DeploymentStatus, Workspace, WorkspaceInCreate, WorkspacePatch,
};

use crate::embedded::EmbeddedControlPlane;

#[derive(Subcommand)]
pub enum WorkspaceCommand {
    /// Create and persist a workspace
    Create {
        /// Resource template name
        #[arg(long = "type", value_name = "TEMPLATE")]
        workspace_type: String,

        /// Exact template version (default: latest)
        #[arg(long, value_name = "VERSION")]
        template_version: Option<String>,

        /// Template parameter, repeatable (e.g. -p app_id=abc -p gpu=true)
        #[arg(short = 'p', long = "property", value_name = "KEY=VALUE", value_parser = parse_property)]
        properties: Vec<(String, ParameterValue)>,

        /// Assemble the workspace without saving it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show a workspace
    Get {
        #[arg(value_name = "WORKSPACE_ID")]
        id: String,

        /// Fail unless the workspace is deployed
        #[arg(long)]
        deployed: bool,
    },

    /// List active workspaces
    List,

    /// Move a workspace to a new deployment status
    Status {
        #[arg(value_name = "WORKSPACE_ID")]
        id: String,

        /// deploying, deployed, deleting, deleted or failed
        #[arg(value_name = "STATUS")]
        status: DeploymentStatus,

        /// Deployment message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Enable a workspace
    Enable {
        #[arg(value_name = "WORKSPACE_ID")]
        id: String,
    },

    /// Disable a workspace
    Disable {
        #[arg(value_name = "WORKSPACE_ID")]
        id: String,
    },

    /// Report overlapping or invalid address spaces among active workspaces
    Conflicts,
}

/// Parse `key=value`; booleans, numbers and JSON arrays or objects are typed,
/// anything else is a string
pub fn parse_property(raw: &str) -> Result<(String, ParameterValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }

    let value = if value.starts_with('[') || value.starts_with('{') {
        serde_json::from_str::<ParameterValue>(value)
            .map_err(|e| format!("invalid JSON value for '{}': {}", key, e))?
    } else if let Ok(b) = value.parse::<bool>() {
        ParameterValue::Bool(b)
    } else if let Ok(i) = value.parse::<i64>() {
        ParameterValue::Integer(i)
    } else if let Some(n) = value.parse::<f64>().ok().filter(|n| n.is_finite()) {
        ParameterValue::Number(n)
    } else {
        ParameterValue::String(value.to_string())
    };

    Ok((key.to_string(), value))
}

pub async fn handle_command(
    command: WorkspaceCommand,
    config_path: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let control_plane = EmbeddedControlPlane::new(config_path).await?;
    control_plane.bootstrap().await?;
    let workspaces = &control_plane.repositories().workspaces;

    match command {
        WorkspaceCommand::Create {
            workspace_type,
            template_version,
            properties,
            dry_run,
        } => {
            let input = WorkspaceInCreate {
                workspace_type,
                template_version,
                properties: properties.into_iter().collect::<Parameters>(),
            };
            let workspace = workspaces
                .create_workspace(&input)
                .await
                .context("Failed to create workspace")?;

            if !dry_run {
                workspaces
                    .save_workspace(&workspace)
                    .await
                    .context("Failed to save workspace")?;
            }

            if json {
                print_json(&workspace)?;
            } else {
                let verb = if dry_run { "assembled (not saved)" } else { "created" };
                println!("{}", format!("✓ Workspace {}", verb).green());
                print_workspace(&workspace);
            }
        }
        WorkspaceCommand::Get { id, deployed } => {
            let workspace = if deployed {
                workspaces.get_deployed_workspace_by_id(&id).await?
            } else {
                workspaces.get_workspace_by_id(&id).await?
            };
            if json {
                print_json(&workspace)?;
            } else {
                print_workspace(&workspace);
            }
        }
        WorkspaceCommand::List => {
            let active = workspaces.get_active_workspaces().await?;
            if json {
                print_json(&active)?;
            } else if active.is_empty() {
                println!("{}", "No active workspaces".dimmed());
            } else {
                println!(
                    "{:<38} {:<20} {:<10} {:<14} {}",
                    "ID".bold(),
                    "TEMPLATE".bold(),
                    "VERSION".bold(),
                    "STATUS".bold(),
                    "ADDRESS SPACE".bold()
                );
                for ws in &active {
                    println!(
                        "{:<38} {:<20} {:<10} {:<14} {}",
                        ws.id(),
                        ws.resource_template_name(),
                        ws.resource_template_version().to_string(),
                        ws.status().as_str(),
                        ws.address_space().unwrap_or("-")
                    );
                }
            }
        }
        WorkspaceCommand::Status { id, status, message } => {
            let message = message.unwrap_or_else(|| status.to_string());
            let workspace = workspaces
                .update_deployment_status(&id, status, message)
                .await
                .context("Failed to update deployment status")?;
            if json {
                print_json(&workspace)?;
            } else {
                println!(
                    "{}",
                    format!("✓ Workspace {} is now {}", workspace.id(), workspace.status()).green()
                );
            }
        }
        WorkspaceCommand::Enable { id } => set_enabled(&control_plane, &id, true, json).await?,
        WorkspaceCommand::Disable { id } => set_enabled(&control_plane, &id, false, json).await?,
        WorkspaceCommand::Conflicts => {
            let conflicts = workspaces.find_address_space_conflicts().await?;
            if json {
                let rendered: Vec<serde_json::Value> = conflicts.iter().map(conflict_json).collect();
                print_json(&rendered)?;
            } else if conflicts.is_empty() {
                println!("{}", "✓ No address space conflicts".green());
            } else {
                for conflict in &conflicts {
                    print_conflict(conflict);
                }
            }
        }
    }

    Ok(())
}

async fn set_enabled(
    control_plane: &EmbeddedControlPlane,
    id: &str,
    enabled: bool,
    json: bool,
) -> Result<()> {
    let workspaces = &control_plane.repositories().workspaces;
    let current = workspaces.get_workspace_by_id(id).await?;
    let patched = workspaces
        .patch_workspace(&current, &WorkspacePatch { enabled })
        .await
        .context("Failed to patch workspace")?;

    if json {
        print_json(&patched)?;
    } else {
        let state = if enabled { "enabled" } else { "disabled" };
        println!("{}", format!("✓ Workspace {} {}", patched.id(), state).green());
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_workspace(workspace: &Workspace) {
    println!("{} {}", "Workspace".bold(), workspace.id());
    println!(
        "  Template: {} {}",
        workspace.resource_template_name(),
        workspace.resource_template_version()
    );
    println!(
        "  Status: {} ({})",
        workspace.status().as_str().cyan(),
        workspace.deployment().message()
    );
    println!("  Address space: {}", workspace.address_space().unwrap_or("-"));
    println!("  Parameters:");
    for (key, value) in workspace.resource_template_parameters() {
        println!("    {}: {}", key, value);
    }
    if !workspace.auth_information().is_empty() {
        println!("  Auth information:");
        for (key, value) in workspace.auth_information().entries() {
            println!("    {}: {}", key, value);
        }
    }
}

fn print_conflict(conflict: &AddressSpaceConflict) {
    match conflict {
        AddressSpaceConflict::Overlap {
            first_id,
            first_address_space,
            second_id,
            second_address_space,
        } => println!(
            "{} {} ({}) overlaps {} ({})",
            "✗".red(),
            first_id,
            first_address_space,
            second_id,
            second_address_space
        ),
        AddressSpaceConflict::Invalid {
            workspace_id,
            address_space,
        } => println!(
            "{} {} has invalid address space: {}",
            "✗".red(),
            workspace_id,
            address_space.as_deref().unwrap_or("(missing)")
        ),
    }
}

fn conflict_json(conflict: &AddressSpaceConflict) -> serde_json::Value {
    match conflict {
        AddressSpaceConflict::Overlap {
            first_id,
            first_address_space,
            second_id,
            second_address_space,
        } => serde_json::json!({
            "kind": "overlap",
            "workspaces": [
                {"id": first_id, "addressSpace": first_address_space},
                {"id": second_id, "addressSpace": second_address_space},
            ],
        }),
        AddressSpaceConflict::Invalid {
            workspace_id,
            address_space,
        } => serde_json::json!({
            "kind": "invalid",
            "workspaces": [{"id": workspace_id, "addressSpace": address_space}],
        }),
    }
}
