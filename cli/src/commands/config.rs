// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use workbench_core::domain::config::{ControlPlaneConfigManifest, StateStoreBackend};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective manifest as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./workbench-config.yaml)
        #[arg(short, long, default_value = "./workbench-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate {
            output,
            examples,
            force,
        } => generate(output, examples, force).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    let config = ControlPlaneConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. WORKBENCH_CONFIG_PATH: {}",
            std::env::var("WORKBENCH_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./workbench-config.yaml");
        println!("  4. ~/.workbench/config.yaml");
        println!("  5. /etc/workbench/config.yaml");
        println!();
    }

    if as_yaml {
        print!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    println!("{}", "Current configuration:".bold());
    println!();

    let spec = &config.spec;
    println!("{}", "Deployment:".bold());
    println!("  Name: {}", config.metadata.name);
    println!("  ID: {}", spec.deployment.id);
    println!("  Location: {}", spec.deployment.location);
    println!();

    println!("{}", "State Store:".bold());
    match spec.state_store.backend {
        StateStoreBackend::InMemory => println!("  Backend: in-memory"),
        StateStoreBackend::Postgres => {
            println!("  Backend: postgres");
            let has_url = spec.state_store.connection_string.is_some();
            println!(
                "  Connection: {}",
                if has_url { "(set)".normal() } else { "(missing)".red() }
            );
        }
    }
    println!("  Resources container: {}", spec.state_store.resources_container);
    println!("  Templates container: {}", spec.state_store.templates_container);
    println!("  Throughput: {}", spec.state_store.throughput);
    println!();

    println!("{}", "Network:".bold());
    println!("  Address pool: {}", spec.network.address_pool);
    println!("  Default prefix: /{}", spec.network.default_prefix_length);
    println!();

    println!("{}", "Templates:".bold());
    match &spec.templates.seed_file {
        Some(path) => println!("  Seed file: {}", path.display()),
        None => println!("  Seed file: {}", "(bundled)".dimmed()),
    }
    println!();

    println!("{}", "Auth:".bold());
    println!(
        "  Tenant: {}",
        spec.auth.tenant_id.as_deref().unwrap_or("(none)")
    );
    if spec.auth.known_app_ids.is_empty() {
        println!("  Known app ids: {}", "(any)".dimmed());
    } else {
        println!("  Known app ids: {}", spec.auth.known_app_ids.join(", "));
    }
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ControlPlaneConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    if let Some(seed_file) = &config.spec.templates.seed_file {
        if !seed_file.exists() {
            println!(
                "{}",
                format!("⚠ Template seed file not found: {}", seed_file.display()).yellow()
            );
        }
    }

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }

    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_samples_are_valid() {
        for sample in [
            include_str!("../../templates/config-minimal.yaml"),
            include_str!("../../templates/config-with-examples.yaml"),
        ] {
            let config = ControlPlaneConfigManifest::from_yaml_str(sample).unwrap();
            config.validate().unwrap();
        }
    }

    #[tokio::test]
    async fn test_generate_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("workbench-config.yaml");

        generate(output.clone(), false, false).await.unwrap();
        assert!(generate(output.clone(), true, false).await.is_err());
        generate(output.clone(), true, true).await.unwrap();

        let config = ControlPlaneConfigManifest::from_yaml_file(&output).unwrap();
        assert!(config.validate().is_ok());
    }
}
