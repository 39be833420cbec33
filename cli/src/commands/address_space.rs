// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Address space commands
//!
//! `allocate` runs the allocator against explicitly given in-use blocks; it
//! does not touch the state store.

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::PathBuf;

use workbench_core::domain::address_space::{parse_address_space, AddressSpaceAllocator};
use workbench_core::domain::config::ControlPlaneConfigManifest;

#[derive(Subcommand)]
pub enum AddressSpaceCommand {
    /// Compute the lowest free block of a pool
    Allocate {
        /// Base pool (default: network.address_pool from configuration)
        #[arg(long, value_name = "CIDR")]
        pool: Option<String>,

        /// Block size (default: network.default_prefix_length)
        #[arg(long, value_name = "LENGTH")]
        prefix_length: Option<u8>,

        /// Block already in use, repeatable
        #[arg(long = "in-use", value_name = "CIDR")]
        in_use: Vec<String>,
    },
}

pub async fn handle_command(
    command: AddressSpaceCommand,
    config_path: Option<PathBuf>,
) -> Result<()> {
    match command {
        AddressSpaceCommand::Allocate {
            pool,
            prefix_length,
            in_use,
        } => {
            let config = ControlPlaneConfigManifest::load_or_default(config_path)
                .context("Failed to load configuration")?;
            let block = allocate(&config, pool.as_deref(), prefix_length, &in_use)?;
            println!("{}", block);
            Ok(())
        }
    }
}

pub fn allocate(
    config: &ControlPlaneConfigManifest,
    pool: Option<&str>,
    prefix_length: Option<u8>,
    in_use: &[String],
) -> Result<String> {
    let network = &config.spec.network;
    let allocator = AddressSpaceAllocator::from_cidr(pool.unwrap_or(&network.address_pool))?;

    let in_use = in_use
        .iter()
        .map(|cidr| parse_address_space(cidr))
        .collect::<Result<Vec<_>, _>>()?;

    let prefix_length = prefix_length.unwrap_or(network.default_prefix_length);
    let block = allocator.allocate(&in_use, prefix_length)?;
    Ok(block.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_from_config_defaults() {
        let config = ControlPlaneConfigManifest::default();
        let in_use = vec!["10.0.0.0/24".to_string(), "10.0.1.0/24".to_string()];
        assert_eq!(allocate(&config, None, None, &in_use).unwrap(), "10.0.2.0/24");
    }

    #[test]
    fn test_allocate_with_overrides() {
        let config = ControlPlaneConfigManifest::default();
        let in_use = vec!["192.168.0.0/26".to_string()];
        assert_eq!(
            allocate(&config, Some("192.168.0.0/24"), Some(26), &in_use).unwrap(),
            "192.168.0.64/26"
        );
    }

    #[test]
    fn test_allocate_errors() {
        let config = ControlPlaneConfigManifest::default();
        assert!(allocate(&config, Some("10.0.0.0/24"), None, &["10.0.0.0/24".to_string()]).is_err());
        assert!(allocate(&config, None, None, &["bogus".to_string()]).is_err());
    }
}
