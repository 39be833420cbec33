// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Resource Repository
//!
//! Typed CRUD and predicate queries over one container of the document
//! store. Every stored document carries its `resourceType` discriminator and
//! every read checks it, so fetching a template id as a workspace is a
//! `ResourceNotFound`, not a decoding accident.
//!
//! Writes are last-writer-wins at the store; `create` is conditional on the
//! id being absent. `patch_field` writes a single field in place, so it never
//! clobbers fields written concurrently by another caller.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Generic typed repository over a `DocumentStore`

use serde_json::Value;
use std::sync::Arc;
use crate::domain::error::{ControlPlaneError, Result};
use crate::domain::repository::{
    ContainerSpec, ContainerStatus, DocumentStore, Predicate, RepositoryError, StoredDocument,
};
use crate::domain::resource::{Resource, ResourceDocument, RESOURCE_KIND_FIELD};

#[derive(Clone)]
pub struct ResourceRepository {
    store: Arc<dyn DocumentStore>,
    container: ContainerSpec,
}

impl ResourceRepository {
    pub fn new(store: Arc<dyn DocumentStore>, container: ContainerSpec) -> Self {
        Self { store, container }
    }

    pub fn container(&self) -> &ContainerSpec {
        &self.container
    }

    /// Provision the backing container; a pre-existing one is left alone
    pub async fn ensure_container(&self) -> Result<ContainerStatus> {
        let status = self.store.ensure_container(&self.container).await?;
        match status {
            ContainerStatus::Created => tracing::info!(
                container = %self.container.name,
                partition_key = %self.container.partition_key_path,
                throughput = self.container.throughput,
                "Created container"
            ),
            ContainerStatus::AlreadyExists => {
                tracing::debug!(container = %self.container.name, "Container already exists")
            }
        }
        Ok(status)
    }

    /// Store-side filtered read across all resource kinds
    pub async fn query_documents(&self, predicate: &Predicate) -> Result<Vec<ResourceDocument>> {
        tracing::debug!(container = %self.container.name, query = %predicate, "Querying resources");
        let bodies = self.store.query(&self.container.name, predicate).await?;
        bodies.into_iter().map(decode_document).collect()
    }

    /// Filtered read restricted to documents of kind `T`
    pub async fn query<T: Resource>(&self, predicate: Predicate) -> Result<Vec<T>> {
        let predicate = Predicate::eq(RESOURCE_KIND_FIELD, T::KIND.as_str()).and(predicate);
        let documents = self.query_documents(&predicate).await?;
        Ok(documents.into_iter().filter_map(T::from_document).collect())
    }

    /// Point read. A missing document and a document of another kind are
    /// both `ResourceNotFound`.
    pub async fn get_by_id<T: Resource>(&self, id: &str) -> Result<T> {
        let not_found = || ControlPlaneError::ResourceNotFound {
            kind: T::KIND,
            id: id.to_string(),
        };

        let body = self
            .store
            .read(&self.container.name, id)
            .await?
            .ok_or_else(not_found)?;

        if body.get(RESOURCE_KIND_FIELD).and_then(Value::as_str) != Some(T::KIND.as_str()) {
            tracing::debug!(id, expected = T::KIND.as_str(), "Stored document is of another resource type");
            return Err(not_found());
        }

        T::from_document(decode_document(body)?).ok_or_else(not_found)
    }

    /// Conditional create; an existing id is a `Store(Conflict)`
    pub async fn create<T: Resource>(&self, resource: &T) -> Result<()> {
        let document = self.to_stored(resource)?;
        self.store.create(&self.container.name, document).await?;
        Ok(())
    }

    /// Overwrite an existing resource
    pub async fn update<T: Resource>(&self, resource: &T) -> Result<()> {
        let document = self.to_stored(resource)?;
        self.store
            .replace(&self.container.name, document)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound(id) => ControlPlaneError::ResourceNotFound { kind: T::KIND, id },
                other => other.into(),
            })
    }

    /// Set one dotted field of a stored resource in place and return the
    /// updated resource.
    pub async fn patch_field<T: Resource>(&self, id: &str, field: &str, value: Value) -> Result<T> {
        let not_found = || ControlPlaneError::ResourceNotFound {
            kind: T::KIND,
            id: id.to_string(),
        };

        // Kind never changes once stored, so this check cannot go stale.
        self.get_by_id::<T>(id).await?;

        let body = self
            .store
            .patch_field(&self.container.name, id, field, value)
            .await?
            .ok_or_else(not_found)?;
        T::from_document(decode_document(body)?).ok_or_else(not_found)
    }

    fn to_stored<T: Resource>(&self, resource: &T) -> Result<StoredDocument> {
        let body = serde_json::to_value(resource.to_document()).map_err(RepositoryError::from)?;
        let partition_key = self.container.partition_key_of(&body)?;
        Ok(StoredDocument {
            id: resource.id().to_string(),
            partition_key,
            body,
        })
    }
}

fn decode_document(body: Value) -> Result<ResourceDocument> {
    serde_json::from_value(body).map_err(|e| RepositoryError::from(e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::auth::AuthInformation;
    use crate::domain::resource::ResourceKind;
    use crate::domain::resource_template::{ParameterSchema, Parameters, ResourceTemplate};
    use crate::domain::workspace::{DeploymentStatus, Workspace};
    use crate::infrastructure::repositories::InMemoryDocumentStore;
    use semver::Version;

    async fn repository() -> ResourceRepository {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let repo = ResourceRepository::new(store, ContainerSpec::new("resources", "/id", 400));
        repo.ensure_container().await.unwrap();
        repo
    }

    fn workspace(id: &str) -> Workspace {
        Workspace::new(id, "research-vm", Version::new(0, 1, 0), Parameters::new(), AuthInformation::default())
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let repo = repository().await;
        let ws = workspace("ws-1");
        repo.create(&ws).await.unwrap();

        let fetched: Workspace = repo.get_by_id("ws-1").await.unwrap();
        assert_eq!(fetched, ws);
    }

    #[tokio::test]
    async fn test_get_by_id_kind_mismatch() {
        let repo = repository().await;
        let template = ResourceTemplate::new(
            "research-vm",
            Version::new(0, 1, 0),
            ParameterSchema::default(),
            Parameters::new(),
        );
        repo.create(&template).await.unwrap();

        let err = repo.get_by_id::<Workspace>(&template.id).await.unwrap_err();
        assert_eq!(
            err,
            ControlPlaneError::ResourceNotFound {
                kind: ResourceKind::Workspace,
                id: template.id.clone(),
            }
        );

        let missing = repo.get_by_id::<Workspace>("nope").await.unwrap_err();
        assert!(matches!(missing, ControlPlaneError::ResourceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_query_is_restricted_to_kind() {
        let repo = repository().await;
        repo.create(&workspace("ws-1")).await.unwrap();
        repo.create(&ResourceTemplate::new(
            "research-vm",
            Version::new(0, 1, 0),
            ParameterSchema::default(),
            Parameters::new(),
        ))
        .await
        .unwrap();

        let workspaces: Vec<Workspace> = repo.query(Predicate::All).await.unwrap();
        assert_eq!(workspaces.len(), 1);
        assert_eq!(repo.query_documents(&Predicate::All).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_conflict_and_update_missing() {
        let repo = repository().await;
        let mut ws = workspace("ws-1");
        repo.create(&ws).await.unwrap();

        let conflict = repo.create(&ws).await.unwrap_err();
        assert!(matches!(conflict, ControlPlaneError::Store(RepositoryError::Conflict(_))));

        ws.transition_to(DeploymentStatus::Deploying, "deploying").unwrap();
        repo.update(&ws).await.unwrap();
        let fetched: Workspace = repo.get_by_id("ws-1").await.unwrap();
        assert_eq!(fetched.status(), DeploymentStatus::Deploying);

        let missing = repo.update(&workspace("ws-2")).await.unwrap_err();
        assert!(matches!(missing, ControlPlaneError::ResourceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_patch_field() {
        let repo = repository().await;
        let ws = workspace("ws-1");
        repo.create(&ws).await.unwrap();

        let patched: Workspace = repo
            .patch_field("ws-1", "resourceTemplateParameters.enabled", Value::Bool(false))
            .await
            .unwrap();
        assert_eq!(patched.is_enabled(), Some(false));
        assert_eq!(patched.status(), DeploymentStatus::NotDeployed);

        let template = ResourceTemplate::new(
            "research-vm",
            Version::new(0, 1, 0),
            ParameterSchema::default(),
            Parameters::new(),
        );
        repo.create(&template).await.unwrap();
        let err = repo
            .patch_field::<Workspace>(&template.id, "name", Value::from("hijacked"))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlPlaneError::ResourceNotFound { .. }));
        let unchanged: ResourceTemplate = repo.get_by_id(&template.id).await.unwrap();
        assert_eq!(unchanged.name, "research-vm");

        let missing = repo
            .patch_field::<Workspace>("nope", "resourceTemplateParameters.enabled", Value::Bool(true))
            .await
            .unwrap_err();
        assert!(matches!(missing, ControlPlaneError::ResourceNotFound { .. }));
    }
}
