// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Embedded control plane
//!
//! Builds the state store and repositories in-process from the loaded
//! configuration. Commands run against it directly.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use workbench_core::{
    application::{
        bootstrap_state_store, create_document_store, create_repositories, BootstrapReport,
        Repositories,
    },
    domain::config::{ControlPlaneConfigManifest, StateStoreBackend},
    infrastructure::{StaticAuthResolver, TemplateSeed},
};

pub struct EmbeddedControlPlane {
    config: ControlPlaneConfigManifest,
    repositories: Repositories,
}

impl EmbeddedControlPlane {
    /// Load and validate configuration, then connect to the state store
    pub async fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config = ControlPlaneConfigManifest::load_or_default(config_path)
            .context("Failed to load configuration")?;
        config.validate().context("Configuration validation failed")?;

        if config.spec.state_store.backend == StateStoreBackend::InMemory {
            tracing::warn!("In-memory state store: nothing outlives this command");
        }

        let backend = config.storage_backend()?;
        let store = create_document_store(&backend).await?;
        let auth = Arc::new(StaticAuthResolver::from_config(&config.spec.auth));
        let repositories = create_repositories(store, &config, auth)?;

        Ok(Self { config, repositories })
    }

    pub fn config(&self) -> &ControlPlaneConfigManifest {
        &self.config
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repositories
    }

    /// Provision containers and seed templates; safe to run on every start
    pub async fn bootstrap(&self) -> Result<BootstrapReport> {
        let seed_file = self.config.spec.templates.seed_file.clone();
        bootstrap_state_store(&self.repositories.resources, &self.repositories.catalog, move || {
            let seed = TemplateSeed::load(seed_file.as_deref())?;
            Ok(seed.into_templates()?)
        })
        .await
    }
}
