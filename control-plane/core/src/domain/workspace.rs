// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use crate::domain::auth::AuthInformation;
use crate::domain::resource_template::{ParameterValue, Parameters};

/// Deployment message of a freshly assembled workspace
pub const NOT_DEPLOYED_MESSAGE: &str = "not yet deployed";

/// Parameter holding the workspace CIDR block
pub const ADDRESS_SPACE_PARAMETER: &str = "address_space";

/// Parameter holding the application id used to resolve auth information
pub const APP_ID_PARAMETER: &str = "app_id";

/// Parameter toggled by [`WorkspacePatch`]
pub const ENABLED_PARAMETER: &str = "enabled";

/// Document field holding the merged template parameters
pub const PARAMETERS_FIELD: &str = "resourceTemplateParameters";

// ============================================================================
// Value Objects
// ============================================================================

/// Deployment status lifecycle
///
/// ```text
/// NotDeployed -> Deploying -> Deployed -> Deleting -> Deleted
///                    |                       |
///                    +------> Failed <-------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Record exists, nothing provisioned yet
    NotDeployed,
    /// Orchestrator is provisioning infrastructure
    Deploying,
    /// Infrastructure is up and usable
    Deployed,
    /// Orchestrator is tearing infrastructure down
    Deleting,
    /// Torn down; address space is released
    Deleted,
    /// Needs operator intervention
    Failed,
}

impl DeploymentStatus {
    pub fn can_transition_to(&self, next: DeploymentStatus) -> bool {
        use DeploymentStatus::*;
        matches!(
            (self, next),
            (NotDeployed, Deploying)
                | (Deploying, Deployed)
                | (Deploying, Failed)
                | (Deployed, Deleting)
                | (Deleting, Deleted)
                | (Deleting, Failed)
        )
    }

    /// Active workspaces hold their address space
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Deleted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotDeployed => "not_deployed",
            Self::Deploying => "deploying",
            Self::Deployed => "deployed",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeploymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "not_deployed" => Ok(Self::NotDeployed),
            "deploying" => Ok(Self::Deploying),
            "deployed" => Ok(Self::Deployed),
            "deleting" => Ok(Self::Deleting),
            "deleted" => Ok(Self::Deleted),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown deployment status '{}'", other)),
        }
    }
}

/// Deployment state of a workspace.
///
/// The status can only move through [`Deployment::transition_to`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    status: DeploymentStatus,
    message: String,
}

impl Deployment {
    pub fn not_deployed() -> Self {
        Self {
            status: DeploymentStatus::NotDeployed,
            message: NOT_DEPLOYED_MESSAGE.to_string(),
        }
    }

    pub fn status(&self) -> DeploymentStatus {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn transition_to(
        &mut self,
        next: DeploymentStatus,
        message: impl Into<String>,
    ) -> Result<(), WorkspaceError> {
        if !self.status.can_transition_to(next) {
            return Err(WorkspaceError::InvalidStateTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.message = message.into();
        Ok(())
    }
}

/// Request to create a workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceInCreate {
    /// Resource template name
    pub workspace_type: String,

    /// Exact template version; latest when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_version: Option<String>,

    #[serde(default)]
    pub properties: Parameters,
}

/// Restricted field-level patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspacePatch {
    pub enabled: bool,
}

impl WorkspacePatch {
    /// Document fields written by this patch, as dotted paths into the stored
    /// workspace. Identity, template binding and deployment are never listed.
    pub fn field_updates(&self) -> Vec<(String, Value)> {
        vec![(
            format!("{}.{}", PARAMETERS_FIELD, ENABLED_PARAMETER),
            Value::Bool(self.enabled),
        )]
    }
}

// ============================================================================
// Aggregate Root: Workspace
// ============================================================================

/// Workspace aggregate root, persisted as one document per id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    id: String,
    resource_template_name: String,
    resource_template_version: Version,
    resource_template_parameters: Parameters,
    deployment: Deployment,
    auth_information: AuthInformation,
}

impl Workspace {
    /// Assemble a workspace in `NotDeployed` state
    pub fn new(
        id: impl Into<String>,
        resource_template_name: impl Into<String>,
        resource_template_version: Version,
        resource_template_parameters: Parameters,
        auth_information: AuthInformation,
    ) -> Self {
        Self {
            id: id.into(),
            resource_template_name: resource_template_name.into(),
            resource_template_version,
            resource_template_parameters,
            deployment: Deployment::not_deployed(),
            auth_information,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn resource_template_name(&self) -> &str {
        &self.resource_template_name
    }

    pub fn resource_template_version(&self) -> &Version {
        &self.resource_template_version
    }

    pub fn resource_template_parameters(&self) -> &Parameters {
        &self.resource_template_parameters
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn auth_information(&self) -> &AuthInformation {
        &self.auth_information
    }

    pub fn status(&self) -> DeploymentStatus {
        self.deployment.status
    }

    pub fn is_active(&self) -> bool {
        self.deployment.status.is_active()
    }

    pub fn is_enabled(&self) -> Option<bool> {
        self.resource_template_parameters
            .get(ENABLED_PARAMETER)
            .and_then(ParameterValue::as_bool)
    }

    pub fn address_space(&self) -> Option<&str> {
        self.resource_template_parameters
            .get(ADDRESS_SPACE_PARAMETER)
            .and_then(ParameterValue::as_str)
    }

    // ========================================================================
    // Aggregate Commands (State Mutations)
    // ========================================================================

    /// Move the deployment to `next`, enforcing the lifecycle table
    pub fn transition_to(
        &mut self,
        next: DeploymentStatus,
        message: impl Into<String>,
    ) -> Result<(), WorkspaceError> {
        self.deployment.transition_to(next, message)
    }
}

// ============================================================================
// Domain Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: DeploymentStatus,
        to: DeploymentStatus,
    },
}

// ============================================================================
// Tests
// ============================================================================
