// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Workbench Control Plane CLI
//!
//! The `workbench` binary runs control plane operations against the
//! configured state store.
//!
//! ## Commands
//!
//! - `workbench config show|validate|generate` - Configuration management
//! - `workbench bootstrap` - Provision containers and seed templates
//! - `workbench workspace create|get|list|status|enable|disable|conflicts` - Workspace operations
//! - `workbench address-space allocate` - Dry-run the address space allocator

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use workbench_cli::commands::{self, AddressSpaceCommand, ConfigCommand, WorkspaceCommand};

/// Workbench control plane - workspace lifecycle and allocation
#[derive(Parser)]
#[command(name = "workbench")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "WORKBENCH_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "WORKBENCH_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Provision the state store and seed the template catalog
    #[command(name = "bootstrap")]
    Bootstrap,

    /// Workspace operations
    #[command(name = "workspace")]
    Workspace {
        /// Print results as JSON
        #[arg(long, global = true)]
        json: bool,

        #[command(subcommand)]
        command: WorkspaceCommand,
    },

    /// Address space allocation
    #[command(name = "address-space")]
    AddressSpace {
        #[command(subcommand)]
        command: AddressSpaceCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli.log_level)?;

    match cli.command {
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Bootstrap) => commands::bootstrap::handle_command(cli.config).await,
        Some(Commands::Workspace { json, command }) => {
            commands::workspace::handle_command(command, cli.config, json).await
        }
        Some(Commands::AddressSpace { command }) => {
            commands::address_space::handle_command(command, cli.config).await
        }
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}
