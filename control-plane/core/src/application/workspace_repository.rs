// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Workspace Repository
//!
//! Builds, fetches and patches workspaces. Creation resolves the template,
//! resolves auth information for the caller's `app_id`, picks an address
//! space and layers the system-reserved parameters on top.
//!
//! ## Parameter Precedence (lowest first)
//!
//! 1. template defaults
//! 2. caller `properties`
//! 3. `address_space` (caller-supplied or allocated)
//! 4. system-reserved keys: `tre_id`, `location`, `workspace_id`
//!
//! ## Allocation Race
//!
//! Address-space selection reads the active workspaces and then writes the
//! new one; the store offers no compare-and-swap across documents, so two
//! concurrent creations may pick the same block. Workspace ids are protected
//! by conditional create only. [`WorkspaceRepository::find_address_space_conflicts`]
//! reports any overlap that slipped through.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Workspace lifecycle over the resources container

use ipnetwork::Ipv4Network;
use std::sync::Arc;
use uuid::Uuid;
use crate::application::resource_repository::ResourceRepository;
use crate::application::template_catalog::TemplateCatalog;
use crate::domain::address_space::{overlaps, parse_address_space, AddressSpaceAllocator};
use crate::domain::auth::AuthResolver;
use crate::domain::config::ControlPlaneConfigManifest;
use crate::domain::error::{ControlPlaneError, Result};
use crate::domain::repository::Predicate;
use crate::domain::resource_template::{ParameterValue, Parameters};
use crate::domain::workspace::{
    DeploymentStatus, Workspace, WorkspaceInCreate, WorkspacePatch, ADDRESS_SPACE_PARAMETER,
    APP_ID_PARAMETER,
};

/// Deployment id of the control plane
pub const TRE_ID_PARAMETER: &str = "tre_id";
/// Deployment region
pub const LOCATION_PARAMETER: &str = "location";
/// Short workspace identifier (last four characters of the id)
pub const WORKSPACE_ID_PARAMETER: &str = "workspace_id";

const WORKSPACE_ID_SUFFIX_LEN: usize = 4;

/// Deployment-wide values stamped on every workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSettings {
    pub deployment_id: String,
    pub location: String,
}

impl WorkspaceSettings {
    pub fn from_config(config: &ControlPlaneConfigManifest) -> Self {
        Self {
            deployment_id: config.spec.deployment.id.clone(),
            location: config.spec.deployment.location.clone(),
        }
    }
}

/// Address-space problem among active workspaces
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressSpaceConflict {
    /// Two active workspaces hold intersecting blocks
    Overlap {
        first_id: String,
        first_address_space: String,
        second_id: String,
        second_address_space: String,
    },
    /// An active workspace has no address space or one that does not parse
    Invalid {
        workspace_id: String,
        address_space: Option<String>,
    },
}

pub struct WorkspaceRepository {
    resources: ResourceRepository,
    catalog: TemplateCatalog,
    allocator: AddressSpaceAllocator,
    auth: Arc<dyn AuthResolver>,
    settings: WorkspaceSettings,
}

impl WorkspaceRepository {
    pub fn new(
        resources: ResourceRepository,
        catalog: TemplateCatalog,
        allocator: AddressSpaceAllocator,
        auth: Arc<dyn AuthResolver>,
        settings: WorkspaceSettings,
    ) -> Self {
        Self {
            resources,
            catalog,
            allocator,
            auth,
            settings,
        }
    }

    pub fn resources(&self) -> &ResourceRepository {
        &self.resources
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn allocator(&self) -> &AddressSpaceAllocator {
        &self.allocator
    }

    /// Assemble a new `NotDeployed` workspace. Nothing is persisted; see
    /// [`save_workspace`](Self::save_workspace).
    pub async fn create_workspace(&self, input: &WorkspaceInCreate) -> Result<Workspace> {
        let id = Uuid::new_v4().to_string();

        let template = self
            .catalog
            .resolve(&input.workspace_type, input.template_version.as_deref())
            .await?;
        let mut parameters = self.catalog.validate(&template, &input.properties)?;

        let app_id = match input.properties.get(APP_ID_PARAMETER) {
            Some(ParameterValue::String(app_id)) => app_id,
            Some(other) => {
                return Err(ControlPlaneError::ValidationFailed(format!(
                    "'{}' must be a string, got {}",
                    APP_ID_PARAMETER,
                    other.type_name()
                )))
            }
            None => {
                return Err(ControlPlaneError::ValidationFailed(format!(
                    "'{}' is required",
                    APP_ID_PARAMETER
                )))
            }
        };
        let auth_information = self.auth.extract_auth_information(app_id).await?;

        let address_space = match input.properties.get(ADDRESS_SPACE_PARAMETER) {
            Some(ParameterValue::String(supplied)) => {
                tracing::debug!(address_space = %supplied, "Using caller-supplied address space");
                supplied.clone()
            }
            Some(other) => {
                return Err(ControlPlaneError::ValidationFailed(format!(
                    "'{}' must be a string, got {}",
                    ADDRESS_SPACE_PARAMETER,
                    other.type_name()
                )))
            }
            None => self.get_new_address_space().await?.to_string(),
        };
        parameters.insert(ADDRESS_SPACE_PARAMETER.to_string(), address_space.into());

        for (key, value) in self.system_parameters(&id) {
            if let Some(previous) = parameters.get(&key) {
                if *previous != value {
                    tracing::warn!(
                        parameter = %key,
                        supplied = %previous,
                        "Overriding caller-supplied system-reserved parameter"
                    );
                }
            }
            parameters.insert(key, value);
        }

        let workspace = Workspace::new(id, template.name, template.version, parameters, auth_information);
        tracing::info!(
            workspace_id = %workspace.id(),
            template = %workspace.resource_template_name(),
            version = %workspace.resource_template_version(),
            address_space = workspace.address_space().unwrap_or_default(),
            "Assembled workspace"
        );
        Ok(workspace)
    }

    fn system_parameters(&self, workspace_id: &str) -> Parameters {
        let suffix_start = workspace_id.len().saturating_sub(WORKSPACE_ID_SUFFIX_LEN);
        let suffix = workspace_id.get(suffix_start..).unwrap_or(workspace_id);

        let mut parameters = Parameters::new();
        parameters.insert(TRE_ID_PARAMETER.to_string(), self.settings.deployment_id.clone().into());
        parameters.insert(LOCATION_PARAMETER.to_string(), self.settings.location.clone().into());
        parameters.insert(WORKSPACE_ID_PARAMETER.to_string(), suffix.into());
        parameters
    }

    /// Persist a freshly assembled workspace; fails if the id already exists
    pub async fn save_workspace(&self, workspace: &Workspace) -> Result<()> {
        self.resources.create(workspace).await?;
        tracing::info!(workspace_id = %workspace.id(), "Saved workspace");
        Ok(())
    }

    /// Workspaces whose status is not `Deleted`, in store order
    pub async fn get_active_workspaces(&self) -> Result<Vec<Workspace>> {
        self.resources
            .query(Predicate::ne("deployment.status", DeploymentStatus::Deleted.as_str()))
            .await
    }

    pub async fn get_workspace_by_id(&self, id: &str) -> Result<Workspace> {
        self.resources.get_by_id(id).await
    }

    /// Like [`get_workspace_by_id`](Self::get_workspace_by_id), but only a
    /// `Deployed` workspace is returned.
    pub async fn get_deployed_workspace_by_id(&self, id: &str) -> Result<Workspace> {
        let workspace = self.get_workspace_by_id(id).await?;
        if workspace.status() != DeploymentStatus::Deployed {
            return Err(ControlPlaneError::ResourceIsNotDeployed {
                id: id.to_string(),
                status: workspace.status(),
            });
        }
        Ok(workspace)
    }

    /// Apply a restricted patch to the stored workspace.
    ///
    /// Only the fields named by [`WorkspacePatch::field_updates`] are written,
    /// in place at the store, so a status written by the orchestrator before
    /// or during the patch is preserved.
    pub async fn patch_workspace(&self, workspace: &Workspace, patch: &WorkspacePatch) -> Result<Workspace> {
        let mut patched = None;
        for (field, value) in patch.field_updates() {
            patched = Some(
                self.resources
                    .patch_field::<Workspace>(workspace.id(), &field, value)
                    .await?,
            );
        }
        let patched = match patched {
            Some(patched) => patched,
            None => self.get_workspace_by_id(workspace.id()).await?,
        };

        tracing::info!(workspace_id = %patched.id(), enabled = patch.enabled, "Patched workspace");
        Ok(patched)
    }

    /// The only path that writes `deployment.status`
    pub async fn update_deployment_status(
        &self,
        id: &str,
        status: DeploymentStatus,
        message: impl Into<String>,
    ) -> Result<Workspace> {
        let mut workspace = self.get_workspace_by_id(id).await?;
        let from = workspace.status();

        if let Err(e) = workspace.transition_to(status, message) {
            tracing::warn!(workspace_id = id, %from, to = %status, "Rejected deployment status transition");
            return Err(e.into());
        }
        self.resources.update(&workspace).await?;

        tracing::info!(workspace_id = id, %from, to = %status, "Deployment status updated");
        Ok(workspace)
    }

    /// Lowest free block of the default size given the active workspaces
    pub async fn get_new_address_space(&self) -> Result<Ipv4Network> {
        let active = self.get_active_workspaces().await?;
        let in_use: Vec<Ipv4Network> = active
            .iter()
            .filter_map(|ws| {
                let value = ws.address_space()?;
                match parse_address_space(value) {
                    Ok(network) => Some(network),
                    Err(e) => {
                        tracing::warn!(workspace_id = %ws.id(), error = %e, "Ignoring unparseable address space");
                        None
                    }
                }
            })
            .collect();

        match self.allocator.allocate_default(&in_use) {
            Ok(block) => {
                tracing::debug!(address_space = %block, in_use = in_use.len(), "Allocated address space");
                Ok(block)
            }
            Err(e) => {
                tracing::error!(pool = %self.allocator.pool(), error = %e, "Address space allocation failed");
                Err(e.into())
            }
        }
    }

    /// Every overlapping pair of active address spaces, plus every active
    /// workspace whose address space is missing or unparseable. Workspaces
    /// are compared in id order.
    pub async fn find_address_space_conflicts(&self) -> Result<Vec<AddressSpaceConflict>> {
        let mut active = self.get_active_workspaces().await?;
        active.sort_by(|a, b| a.id().cmp(b.id()));

        let mut conflicts = Vec::new();
        let mut parsed: Vec<(&Workspace, &str, Ipv4Network)> = Vec::new();

        for ws in &active {
            match ws.address_space().map(|s| (s, parse_address_space(s))) {
                Some((raw, Ok(network))) => parsed.push((ws, raw, network)),
                Some((raw, Err(_))) => conflicts.push(AddressSpaceConflict::Invalid {
                    workspace_id: ws.id().to_string(),
                    address_space: Some(raw.to_string()),
                }),
                None => conflicts.push(AddressSpaceConflict::Invalid {
                    workspace_id: ws.id().to_string(),
                    address_space: None,
                }),
            }
        }

        for (i, (first, first_raw, first_net)) in parsed.iter().enumerate() {
            for (second, second_raw, second_net) in &parsed[i + 1..] {
                if overlaps(first_net, second_net) {
                    conflicts.push(AddressSpaceConflict::Overlap {
                        first_id: first.id().to_string(),
                        first_address_space: first_raw.to_string(),
                        second_id: second.id().to_string(),
                        second_address_space: second_raw.to_string(),
                    });
                }
            }
        }

        if !conflicts.is_empty() {
            tracing::warn!(count = conflicts.len(), "Address space conflicts among active workspaces");
        }
        Ok(conflicts)
    }
}
