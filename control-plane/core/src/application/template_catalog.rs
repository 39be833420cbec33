// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Template Catalog
//!
//! Resolves a workspace type to one registered resource template and
//! validates caller parameters against it.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Read-only template lookup over the templates container

use crate::application::resource_repository::ResourceRepository;
use crate::domain::error::{ControlPlaneError, Result};
use crate::domain::repository::{ContainerStatus, Predicate, RepositoryError};
use crate::domain::resource_template::{parse_version, Parameters, ResourceTemplate};

#[derive(Clone)]
pub struct TemplateCatalog {
    templates: ResourceRepository,
}

impl TemplateCatalog {
    pub fn new(templates: ResourceRepository) -> Self {
        Self { templates }
    }

    pub fn repository(&self) -> &ResourceRepository {
        &self.templates
    }

    /// Resolve `name` at `version`, or at its highest version when `version`
    /// is `None`. A version string that is not valid semver cannot name a
    /// registered template and is reported as not found.
    pub async fn resolve(&self, name: &str, version: Option<&str>) -> Result<ResourceTemplate> {
        let not_found = || ControlPlaneError::TemplateNotFound {
            name: name.to_string(),
            version: version.map(str::to_string),
        };

        let candidates: Vec<ResourceTemplate> = self.templates.query(Predicate::eq("name", name)).await?;

        let resolved = match version {
            Some(requested) => match parse_version(requested) {
                Ok(requested) => candidates.into_iter().find(|t| t.version == requested),
                Err(e) => {
                    tracing::debug!(name, version = requested, error = %e, "Unparseable template version");
                    None
                }
            },
            None => candidates.into_iter().max_by(|a, b| a.version.cmp(&b.version)),
        };

        let template = resolved.ok_or_else(not_found)?;
        tracing::debug!(name, version = %template.version, "Resolved resource template");
        Ok(template)
    }

    /// Merge caller input with the template defaults, enforcing the schema
    pub fn validate(&self, template: &ResourceTemplate, input: &Parameters) -> Result<Parameters> {
        Ok(template.validate(input)?)
    }

    /// All registered templates ordered by name, then version
    pub async fn list(&self) -> Result<Vec<ResourceTemplate>> {
        let mut templates: Vec<ResourceTemplate> = self.templates.query(Predicate::All).await?;
        templates.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
        Ok(templates)
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.list().await?.is_empty())
    }

    /// Register a template unless its `(name, version)` already exists.
    /// Returns `false` when it was already present.
    pub async fn register(&self, template: &ResourceTemplate) -> Result<bool> {
        template.validate_definition()?;
        match self.templates.create(template).await {
            Ok(()) => {
                tracing::info!(name = %template.name, version = %template.version, "Registered resource template");
                Ok(true)
            }
            Err(ControlPlaneError::Store(RepositoryError::Conflict(_))) => {
                tracing::debug!(name = %template.name, version = %template.version, "Resource template already registered");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn ensure_container(&self) -> Result<ContainerStatus> {
        self.templates.ensure_container().await
    }
}
