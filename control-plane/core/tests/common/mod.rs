// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Shared harness: a bootstrapped control plane over the in-memory store.

#![allow(dead_code)]

use std::sync::Arc;
use workbench_core::application::{bootstrap_state_store, create_repositories, Repositories};
use workbench_core::domain::config::ControlPlaneConfigManifest;
use workbench_core::domain::repository::DocumentStore;
use workbench_core::domain::resource_template::{ParameterValue, Parameters};
use workbench_core::domain::workspace::WorkspaceInCreate;
use workbench_core::infrastructure::repositories::InMemoryDocumentStore;
use workbench_core::infrastructure::{StaticAuthResolver, TemplateSeed};

pub struct Harness {
    pub store: InMemoryDocumentStore,
    pub repos: Repositories,
    pub config: ControlPlaneConfigManifest,
}

pub fn config(address_pool: &str) -> ControlPlaneConfigManifest {
    let mut config = ControlPlaneConfigManifest::default();
    config.spec.deployment.id = "tre-test".to_string();
    config.spec.deployment.location = "westeurope".to_string();
    config.spec.network.address_pool = address_pool.to_string();
    config
}

pub async fn harness_with(config: ControlPlaneConfigManifest) -> Harness {
    let store = InMemoryDocumentStore::new();
    let shared: Arc<dyn DocumentStore> = Arc::new(store.clone());
    let auth = Arc::new(StaticAuthResolver::new().with_tenant("tenant-test"));

    let repos = create_repositories(shared, &config, auth).unwrap();
    bootstrap_state_store(&repos.resources, &repos.catalog, || {
        Ok(TemplateSeed::bundled()?.into_templates()?)
    })
    .await
    .unwrap();

    Harness { store, repos, config }
}

pub async fn harness() -> Harness {
    harness_with(config("10.0.0.0/8")).await
}

pub fn research_vm(app_id: &str) -> WorkspaceInCreate {
    request("research-vm", &[("app_id", app_id.into())])
}

pub fn request(workspace_type: &str, properties: &[(&str, ParameterValue)]) -> WorkspaceInCreate {
    WorkspaceInCreate {
        workspace_type: workspace_type.to_string(),
        template_version: None,
        properties: properties
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<Parameters>(),
    }
}
