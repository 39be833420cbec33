// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! State store bootstrap command

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use workbench_core::domain::repository::ContainerStatus;

use crate::embedded::EmbeddedControlPlane;

fn describe(status: ContainerStatus) -> colored::ColoredString {
    match status {
        ContainerStatus::Created => "created".green(),
        ContainerStatus::AlreadyExists => "already exists".dimmed(),
    }
}

pub async fn handle_command(config_path: Option<PathBuf>) -> Result<()> {
    let control_plane = EmbeddedControlPlane::new(config_path).await?;
    let report = control_plane.bootstrap().await?;
    let store = &control_plane.config().spec.state_store;

    println!("{}", "Bootstrap complete".bold());
    println!("  {}: {}", store.resources_container, describe(report.resources_container));
    println!("  {}: {}", store.templates_container, describe(report.templates_container));

    if report.seeded() || report.templates_skipped > 0 {
        println!(
            "  Templates seeded: {} ({} already registered)",
            report.templates_seeded, report.templates_skipped
        );
    } else {
        println!("  Templates: {}", "catalog already populated".dimmed());
    }

    Ok(())
}
