// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! State Store Bootstrap
//!
//! Explicit start-up step, run once before serving requests:
//!
//! 1. provision the resources container (no-op if present)
//! 2. provision the templates container (no-op if present)
//! 3. seed the template catalog when the templates container was just
//!    created, or exists but holds no templates
//!
//! The seed is loaded lazily and only when seeding is needed. A seed that
//! cannot be loaded or contains an invalid template aborts bootstrap; an
//! empty catalog would otherwise surface later as `TemplateNotFound` on every
//! workspace creation.

use anyhow::{Context, Result};
use crate::application::resource_repository::ResourceRepository;
use crate::application::template_catalog::TemplateCatalog;
use crate::domain::repository::ContainerStatus;
use crate::domain::resource_template::ResourceTemplate;

/// Outcome of [`bootstrap_state_store`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub resources_container: ContainerStatus,
    pub templates_container: ContainerStatus,
    /// Templates written by this run
    pub templates_seeded: usize,
    /// Seed entries that were already registered
    pub templates_skipped: usize,
}

impl BootstrapReport {
    pub fn seeded(&self) -> bool {
        self.templates_seeded > 0
    }
}

pub async fn bootstrap_state_store<F>(
    resources: &ResourceRepository,
    catalog: &TemplateCatalog,
    load_seed: F,
) -> Result<BootstrapReport>
where
    F: FnOnce() -> Result<Vec<ResourceTemplate>>,
{
    let resources_container = resources
        .ensure_container()
        .await
        .context("Failed to provision resources container")?;

    let templates_container = catalog
        .ensure_container()
        .await
        .context("Failed to provision templates container")?;

    let needs_seed = match templates_container {
        ContainerStatus::Created => true,
        ContainerStatus::AlreadyExists => catalog
            .is_empty()
            .await
            .context("Failed to inspect template catalog")?,
    };

    let mut report = BootstrapReport {
        resources_container,
        templates_container,
        templates_seeded: 0,
        templates_skipped: 0,
    };

    if !needs_seed {
        tracing::info!("Template catalog already populated, skipping seed");
        return Ok(report);
    }

    let templates = load_seed().context("Failed to load resource template seed")?;
    if templates.is_empty() {
        anyhow::bail!("Resource template seed contains no templates");
    }

    for template in &templates {
        let registered = catalog
            .register(template)
            .await
            .with_context(|| format!("Failed to seed template {} {}", template.name, template.version))?;
        if registered {
            report.templates_seeded += 1;
        } else {
            report.templates_skipped += 1;
        }
    }

    tracing::info!(
        seeded = report.templates_seeded,
        skipped = report.templates_skipped,
        "Seeded resource template catalog"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::{ContainerSpec, DocumentStore};
    use crate::domain::resource_template::{ParameterSchema, Parameters};
    use crate::infrastructure::repositories::InMemoryDocumentStore;
    use semver::Version;
    use std::sync::Arc;

    fn repositories(store: Arc<dyn DocumentStore>) -> (ResourceRepository, TemplateCatalog) {
        let resources = ResourceRepository::new(store.clone(), ContainerSpec::new("resources", "/id", 400));
        let catalog = TemplateCatalog::new(ResourceRepository::new(
            store,
            ContainerSpec::new("resourceTemplates", "/id", 400),
        ));
        (resources, catalog)
    }

    fn seed() -> Result<Vec<ResourceTemplate>> {
        Ok(vec![ResourceTemplate::new(
            "research-vm",
            Version::new(0, 1, 0),
            ParameterSchema::default(),
            Parameters::new(),
        )])
    }

    #[tokio::test]
    async fn test_second_run_does_not_load_seed() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let (resources, catalog) = repositories(store);

        let first = bootstrap_state_store(&resources, &catalog, seed).await.unwrap();
        assert_eq!(first.templates_container, ContainerStatus::Created);
        assert_eq!(first.templates_seeded, 1);

        let second = bootstrap_state_store(&resources, &catalog, || {
            anyhow::bail!("seed must not be loaded")
        })
        .await
        .unwrap();
        assert_eq!(second.resources_container, ContainerStatus::AlreadyExists);
        assert_eq!(second.templates_container, ContainerStatus::AlreadyExists);
        assert!(!second.seeded());
    }

    #[tokio::test]
    async fn test_empty_seed_aborts() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let (resources, catalog) = repositories(store);

        let result = bootstrap_state_store(&resources, &catalog, || Ok(Vec::new())).await;
        assert!(result.is_err());
    }
}
