// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use crate::domain::repository::{
    set_field, ContainerSpec, ContainerStatus, DocumentStore, Predicate, RepositoryError,
    StoredDocument,
};

struct Container {
    spec: ContainerSpec,
    documents: BTreeMap<String, Value>,
}

/// In-process document store. Documents are kept in id order, which is the
/// order `query` returns them in.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    containers: Arc<RwLock<HashMap<String, Container>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provisioning parameters of an existing container
    pub fn container_spec(&self, name: &str) -> Option<ContainerSpec> {
        self.containers.read().get(name).map(|c| c.spec.clone())
    }

    pub fn document_count(&self, name: &str) -> usize {
        self.containers
            .read()
            .get(name)
            .map(|c| c.documents.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn ensure_container(&self, spec: &ContainerSpec) -> Result<ContainerStatus, RepositoryError> {
        let mut containers = self.containers.write();
        if containers.contains_key(&spec.name) {
            return Ok(ContainerStatus::AlreadyExists);
        }
        containers.insert(
            spec.name.clone(),
            Container {
                spec: spec.clone(),
                documents: BTreeMap::new(),
            },
        );
        Ok(ContainerStatus::Created)
    }

    async fn container_exists(&self, name: &str) -> Result<bool, RepositoryError> {
        Ok(self.containers.read().contains_key(name))
    }

    async fn query(&self, container: &str, predicate: &Predicate) -> Result<Vec<Value>, RepositoryError> {
        let containers = self.containers.read();
        let container = containers
            .get(container)
            .ok_or_else(|| RepositoryError::ContainerNotFound(container.to_string()))?;

        Ok(container
            .documents
            .values()
            .filter(|doc| predicate.matches(doc))
            .cloned()
            .collect())
    }

    async fn read(&self, container: &str, id: &str) -> Result<Option<Value>, RepositoryError> {
        let containers = self.containers.read();
        let container = containers
            .get(container)
            .ok_or_else(|| RepositoryError::ContainerNotFound(container.to_string()))?;
        Ok(container.documents.get(id).cloned())
    }

    async fn create(&self, container: &str, document: StoredDocument) -> Result<(), RepositoryError> {
        let mut containers = self.containers.write();
        let container = containers
            .get_mut(container)
            .ok_or_else(|| RepositoryError::ContainerNotFound(container.to_string()))?;

        if container.documents.contains_key(&document.id) {
            return Err(RepositoryError::Conflict(document.id));
        }
        container.documents.insert(document.id, document.body);
        Ok(())
    }

    async fn replace(&self, container: &str, document: StoredDocument) -> Result<(), RepositoryError> {
        let mut containers = self.containers.write();
        let container = containers
            .get_mut(container)
            .ok_or_else(|| RepositoryError::ContainerNotFound(container.to_string()))?;

        match container.documents.get_mut(&document.id) {
            Some(existing) => {
                *existing = document.body;
                Ok(())
            }
            None => Err(RepositoryError::NotFound(document.id)),
        }
    }

    async fn patch_field(
        &self,
        container: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<Option<Value>, RepositoryError> {
        let mut containers = self.containers.write();
        let container = containers
            .get_mut(container)
            .ok_or_else(|| RepositoryError::ContainerNotFound(container.to_string()))?;

        Ok(container.documents.get_mut(id).map(|body| {
            set_field(body, field, value);
            body.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, status: &str) -> StoredDocument {
        StoredDocument {
            id: id.to_string(),
            partition_key: id.to_string(),
            body: json!({"id": id, "resourceType": "workspace", "deployment": {"status": status}}),
        }
    }

    #[tokio::test]
    async fn test_ensure_container_is_idempotent() {
        let store = InMemoryDocumentStore::new();
        let spec = ContainerSpec::new("resources", "/id", 400);

        assert_eq!(store.ensure_container(&spec).await.unwrap(), ContainerStatus::Created);
        store.create("resources", doc("a", "deployed")).await.unwrap();

        let altered = ContainerSpec::new("resources", "/name", 1000);
        assert_eq!(store.ensure_container(&altered).await.unwrap(), ContainerStatus::AlreadyExists);

        // Existing container and its contents are untouched
        assert_eq!(store.container_spec("resources"), Some(spec));
        assert_eq!(store.document_count("resources"), 1);
    }

    #[tokio::test]
    async fn test_create_is_conditional() {
        let store = InMemoryDocumentStore::new();
        store.ensure_container(&ContainerSpec::new("resources", "/id", 400)).await.unwrap();

        store.create("resources", doc("a", "deployed")).await.unwrap();
        let err = store.create("resources", doc("a", "deleted")).await.unwrap_err();

        assert_eq!(err, RepositoryError::Conflict("a".to_string()));
        let stored = store.read("resources", "a").await.unwrap().unwrap();
        assert_eq!(stored["deployment"]["status"], "deployed");
    }

    #[tokio::test]
    async fn test_replace_requires_existing_document() {
        let store = InMemoryDocumentStore::new();
        store.ensure_container(&ContainerSpec::new("resources", "/id", 400)).await.unwrap();

        let err = store.replace("resources", doc("a", "deployed")).await.unwrap_err();
        assert_eq!(err, RepositoryError::NotFound("a".to_string()));

        store.create("resources", doc("a", "deploying")).await.unwrap();
        store.replace("resources", doc("a", "deployed")).await.unwrap();
        let stored = store.read("resources", "a").await.unwrap().unwrap();
        assert_eq!(stored["deployment"]["status"], "deployed");
    }

    #[tokio::test]
    async fn test_query_filters_by_predicate() {
        let store = InMemoryDocumentStore::new();
        store.ensure_container(&ContainerSpec::new("resources", "/id", 400)).await.unwrap();
        store.create("resources", doc("a", "deployed")).await.unwrap();
        store.create("resources", doc("b", "deleted")).await.unwrap();
        store.create("resources", doc("c", "not_deployed")).await.unwrap();

        let active = store
            .query("resources", &Predicate::ne("deployment.status", "deleted"))
            .await
            .unwrap();
        let ids: Vec<_> = active.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_missing_container() {
        let store = InMemoryDocumentStore::new();
        assert!(!store.container_exists("resources").await.unwrap());
        assert!(matches!(
            store.read("resources", "a").await,
            Err(RepositoryError::ContainerNotFound(_))
        ));
        assert!(matches!(
            store.create("resources", doc("a", "deployed")).await,
            Err(RepositoryError::ContainerNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_patch_field_leaves_other_fields() {
        let store = InMemoryDocumentStore::new();
        store.ensure_container(&ContainerSpec::new("resources", "/id", 400)).await.unwrap();
        store.create("resources", doc("a", "deploying")).await.unwrap();

        // a status write lands between a caller's read and its patch
        let stale = store.read("resources", "a").await.unwrap().unwrap();
        store.replace("resources", doc("a", "deployed")).await.unwrap();

        let patched = store
            .patch_field("resources", "a", "deployment.message", json!("ok"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stale["deployment"]["status"], "deploying");
        assert_eq!(patched["deployment"]["status"], "deployed");
        assert_eq!(patched["deployment"]["message"], "ok");
        assert_eq!(store.read("resources", "a").await.unwrap().unwrap(), patched);

        assert!(store
            .patch_field("resources", "missing", "deployment.message", json!("ok"))
            .await
            .unwrap()
            .is_none());
    }
}
