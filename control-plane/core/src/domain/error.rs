// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Control Plane Errors
//!
//! Request-level error kinds. Every variant is terminal for the current
//! request; nothing is retried inside the core. The boundary layer maps each
//! kind to a caller-visible response (`ResourceNotFound` and
//! `TemplateNotFound` to 404, `ResourceIsNotDeployed` and
//! `InvalidStateTransition` to 409, `ValidationFailed` to 422, and so on).

use ipnetwork::Ipv4Network;
use thiserror::Error;
use crate::domain::address_space::AddressSpaceError;
use crate::domain::auth::AuthError;
use crate::domain::repository::RepositoryError;
use crate::domain::resource::ResourceKind;
use crate::domain::resource_template::TemplateError;
use crate::domain::workspace::{DeploymentStatus, WorkspaceError};

pub type Result<T> = std::result::Result<T, ControlPlaneError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlPlaneError {
    #[error("Resource not found: {kind} '{id}'")]
    ResourceNotFound { kind: ResourceKind, id: String },

    #[error("Resource template not found: '{name}' (version: {})", .version.as_deref().unwrap_or("latest"))]
    TemplateNotFound { name: String, version: Option<String> },

    #[error("Resource '{id}' is not deployed (status: {status})")]
    ResourceIsNotDeployed { id: String, status: DeploymentStatus },

    #[error("Address space exhausted: no free /{prefix_length} block in {pool}")]
    AddressSpaceExhausted { pool: Ipv4Network, prefix_length: u8 },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: DeploymentStatus,
        to: DeploymentStatus,
    },

    #[error("Auth resolution failed: {0}")]
    AuthResolutionFailed(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Store error: {0}")]
    Store(RepositoryError),
}

impl ControlPlaneError {
    /// True only for `AddressSpaceExhausted`, which an outer orchestration
    /// layer may retry after a workspace reaches `Deleted`.
    pub fn is_retryable_after_release(&self) -> bool {
        matches!(self, Self::AddressSpaceExhausted { .. })
    }
}

impl From<AddressSpaceError> for ControlPlaneError {
    fn from(err: AddressSpaceError) -> Self {
        match err {
            AddressSpaceError::Exhausted { pool, prefix_length } => {
                Self::AddressSpaceExhausted { pool, prefix_length }
            }
            other => Self::ValidationFailed(other.to_string()),
        }
    }
}

impl From<TemplateError> for ControlPlaneError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::NotFound { name, version } => Self::TemplateNotFound { name, version },
            other => Self::ValidationFailed(other.to_string()),
        }
    }
}

impl From<WorkspaceError> for ControlPlaneError {
    fn from(err: WorkspaceError) -> Self {
        match err {
            WorkspaceError::InvalidStateTransition { from, to } => {
                Self::InvalidStateTransition { from, to }
            }
        }
    }
}

impl From<AuthError> for ControlPlaneError {
    fn from(err: AuthError) -> Self {
        Self::AuthResolutionFailed(err.to_string())
    }
}

impl From<RepositoryError> for ControlPlaneError {
    fn from(err: RepositoryError) -> Self {
        Self::Store(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::address_space::parse_address_space;

    #[test]
    fn test_domain_errors_map_to_request_kinds() {
        let pool = parse_address_space("10.0.0.0/8").unwrap();

        let exhausted: ControlPlaneError = AddressSpaceError::Exhausted { pool, prefix_length: 24 }.into();
        assert!(exhausted.is_retryable_after_release());

        let not_found: ControlPlaneError = TemplateError::NotFound {
            name: "research-vm".to_string(),
            version: None,
        }
        .into();
        assert!(matches!(not_found, ControlPlaneError::TemplateNotFound { .. }));
        assert!(!not_found.is_retryable_after_release());

        let missing: ControlPlaneError = TemplateError::SchemaViolation("\"app_id\" is a required property".to_string()).into();
        assert!(matches!(missing, ControlPlaneError::ValidationFailed(_)));

        let auth: ControlPlaneError = AuthError::UnknownApplication("x".to_string()).into();
        assert!(matches!(auth, ControlPlaneError::AuthResolutionFailed(_)));
    }

    #[test]
    fn test_error_messages() {
        let err = ControlPlaneError::TemplateNotFound {
            name: "research-vm".to_string(),
            version: Some("9.9.9".to_string()),
        };
        assert_eq!(err.to_string(), "Resource template not found: 'research-vm' (version: 9.9.9)");

        let err = ControlPlaneError::ResourceIsNotDeployed {
            id: "ws-1".to_string(),
            status: DeploymentStatus::NotDeployed,
        };
        assert_eq!(err.to_string(), "Resource 'ws-1' is not deployed (status: not_deployed)");
    }
}
