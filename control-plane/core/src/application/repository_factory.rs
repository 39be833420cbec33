// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates the concrete [`DocumentStore`] for the configured storage backend
//! and the repositories that sit on top of it. The store is an explicitly
//! constructed value shared by `Arc`; each repository receives it at
//! construction.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Wires domain interfaces to infrastructure implementations

use anyhow::{Context, Result};
use std::sync::Arc;
use crate::application::resource_repository::ResourceRepository;
use crate::application::template_catalog::TemplateCatalog;
use crate::application::workspace_repository::{WorkspaceRepository, WorkspaceSettings};
use crate::domain::auth::AuthResolver;
use crate::domain::config::ControlPlaneConfigManifest;
use crate::domain::repository::{DocumentStore, StorageBackend};
use crate::infrastructure::db::Database;
use crate::infrastructure::repositories::{InMemoryDocumentStore, PostgresDocumentStore};

/// Creates a DocumentStore implementation based on the configured backend
pub async fn create_document_store(backend: &StorageBackend) -> Result<Arc<dyn DocumentStore>> {
    match backend {
        StorageBackend::InMemory => {
            tracing::info!("Using in-memory state store");
            Ok(Arc::new(InMemoryDocumentStore::new()))
        }
        StorageBackend::PostgreSQL(config) => {
            let database = Database::connect(config).await?;
            let store = PostgresDocumentStore::new(database.get_pool().clone());
            store.migrate().await.context("Failed to migrate PostgreSQL state store")?;
            Ok(Arc::new(store))
        }
    }
}

/// Repositories of one control plane instance
pub struct Repositories {
    pub resources: ResourceRepository,
    pub catalog: TemplateCatalog,
    pub workspaces: WorkspaceRepository,
}

/// Build the resources repository, the template catalog and the workspace
/// repository over `store` as described by `config`
pub fn create_repositories(
    store: Arc<dyn DocumentStore>,
    config: &ControlPlaneConfigManifest,
    auth: Arc<dyn AuthResolver>,
) -> Result<Repositories> {
    let allocator = config
        .address_space_allocator()
        .context("Invalid network configuration")?;

    let resources = ResourceRepository::new(store.clone(), config.resources_container());
    let catalog = TemplateCatalog::new(ResourceRepository::new(store, config.templates_container()));
    let workspaces = WorkspaceRepository::new(
        resources.clone(),
        catalog.clone(),
        allocator,
        auth,
        WorkspaceSettings::from_config(config),
    );

    Ok(Repositories {
        resources,
        catalog,
        workspaces,
    })
}
