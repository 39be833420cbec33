// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Workspace lifecycle against a bootstrapped in-memory control plane:
//! creation, persistence round-trip, deployed checks, the deployment state
//! machine, patching and address-space allocation.

mod common;

use common::{config, harness, harness_with, request, research_vm};
use semver::Version;
use workbench_core::application::AddressSpaceConflict;
use workbench_core::domain::address_space::{overlaps, parse_address_space};
use workbench_core::domain::error::ControlPlaneError;
use workbench_core::domain::resource::ResourceKind;
use workbench_core::domain::resource_template::ParameterValue;
use workbench_core::domain::workspace::{DeploymentStatus, WorkspacePatch, NOT_DEPLOYED_MESSAGE};

#[tokio::test]
async fn test_create_then_get_round_trip() {
    let h = harness().await;
    let workspaces = &h.repos.workspaces;

    let created = workspaces.create_workspace(&research_vm("app-123")).await.unwrap();
    workspaces.save_workspace(&created).await.unwrap();

    let fetched = workspaces.get_workspace_by_id(created.id()).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_research_vm_scenario() {
    let h = harness().await;
    let workspaces = &h.repos.workspaces;

    for app_id in ["app-1", "app-2", "app-3"] {
        let ws = workspaces.create_workspace(&research_vm(app_id)).await.unwrap();
        workspaces.save_workspace(&ws).await.unwrap();
    }

    let ws = workspaces.create_workspace(&research_vm("X")).await.unwrap();

    assert_eq!(ws.status(), DeploymentStatus::NotDeployed);
    assert_eq!(ws.deployment().message(), NOT_DEPLOYED_MESSAGE);
    assert_eq!(ws.resource_template_name(), "research-vm");
    // latest seeded version
    assert_eq!(ws.resource_template_version(), &Version::new(0, 2, 0));

    let params = ws.resource_template_parameters();
    assert_eq!(params["tre_id"], ParameterValue::from("tre-test"));
    assert_eq!(params["location"], ParameterValue::from("westeurope"));
    assert_eq!(params["vm_size"], ParameterValue::from("Standard_D4s_v3"));
    assert_eq!(params["enabled"], ParameterValue::Bool(true));

    let allocated = parse_address_space(ws.address_space().unwrap()).unwrap();
    for other in workspaces.get_active_workspaces().await.unwrap() {
        let taken = parse_address_space(other.address_space().unwrap()).unwrap();
        assert!(!overlaps(&allocated, &taken), "{} overlaps {}", allocated, taken);
    }
    assert_eq!(allocated.to_string(), "10.0.3.0/24");
}

#[tokio::test]
async fn test_unsaved_workspace_does_not_hold_address_space() {
    let h = harness().await;
    let workspaces = &h.repos.workspaces;

    let first = workspaces.create_workspace(&research_vm("app-1")).await.unwrap();
    let second = workspaces.create_workspace(&research_vm("app-2")).await.unwrap();

    // Nothing persisted in between, so both see the same free block
    assert_eq!(first.address_space(), second.address_space());
    assert_ne!(first.id(), second.id());
}

#[tokio::test]
async fn test_exact_template_version() {
    let h = harness().await;
    let mut input = research_vm("app-1");
    input.template_version = Some("0.1.0".to_string());

    let ws = h.repos.workspaces.create_workspace(&input).await.unwrap();
    assert_eq!(ws.resource_template_version(), &Version::new(0, 1, 0));
    assert_eq!(
        ws.resource_template_parameters()["vm_size"],
        ParameterValue::from("Standard_D2s_v3")
    );
}

#[tokio::test]
async fn test_unknown_template_and_version() {
    let h = harness().await;
    let workspaces = &h.repos.workspaces;

    let err = workspaces
        .create_workspace(&request("gpu-farm", &[("app_id", "app-1".into())]))
        .await
        .unwrap_err();
    assert!(matches!(err, ControlPlaneError::TemplateNotFound { .. }));

    let mut input = research_vm("app-1");
    input.template_version = Some("9.9.9".to_string());
    let err = workspaces.create_workspace(&input).await.unwrap_err();
    assert!(matches!(err, ControlPlaneError::TemplateNotFound { version: Some(_), .. }));
}

#[tokio::test]
async fn test_missing_required_parameter() {
    let h = harness().await;
    let err = h
        .repos
        .workspaces
        .create_workspace(&request("research-vm", &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, ControlPlaneError::ValidationFailed(_)));
}

#[tokio::test]
async fn test_template_schema_constraints_are_enforced() {
    let h = harness().await;
    let workspaces = &h.repos.workspaces;

    let err = workspaces
        .create_workspace(&request(
            "research-vm",
            &[("app_id", "app-1".into()), ("vm_size", "gigantic".into())],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, ControlPlaneError::ValidationFailed(_)));

    let err = workspaces
        .create_workspace(&request(
            "analytics-cluster",
            &[("app_id", "app-1".into()), ("worker_count", ParameterValue::Integer(0))],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, ControlPlaneError::ValidationFailed(_)));

    let workspace = workspaces
        .create_workspace(&request(
            "analytics-cluster",
            &[
                ("app_id", "app-1".into()),
                ("tags", ParameterValue::Array(vec!["genomics".into()])),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(
        workspace.resource_template_parameters()["tags"],
        ParameterValue::Array(vec!["genomics".into()])
    );
}

#[tokio::test]
async fn test_malformed_template_version_is_not_found() {
    let h = harness().await;
    let mut input = research_vm("app-1");
    input.template_version = Some("v2".to_string());

    let err = h.repos.workspaces.create_workspace(&input).await.unwrap_err();
    assert_eq!(
        err,
        ControlPlaneError::TemplateNotFound {
            name: "research-vm".to_string(),
            version: Some("v2".to_string()),
        }
    );
}

#[tokio::test]
async fn test_get_deployed_workspace_by_id() {
    let h = harness().await;
    let workspaces = &h.repos.workspaces;

    let ws = workspaces.create_workspace(&research_vm("app-1")).await.unwrap();
    workspaces.save_workspace(&ws).await.unwrap();

    let err = workspaces.get_deployed_workspace_by_id(ws.id()).await.unwrap_err();
    assert_eq!(
        err,
        ControlPlaneError::ResourceIsNotDeployed {
            id: ws.id().to_string(),
            status: DeploymentStatus::NotDeployed,
        }
    );

    workspaces
        .update_deployment_status(ws.id(), DeploymentStatus::Deploying, "deploying")
        .await
        .unwrap();
    workspaces
        .update_deployment_status(ws.id(), DeploymentStatus::Deployed, "deployed")
        .await
        .unwrap();

    let deployed = workspaces.get_deployed_workspace_by_id(ws.id()).await.unwrap();
    assert_eq!(deployed.status(), DeploymentStatus::Deployed);
}

#[tokio::test]
async fn test_missing_and_mismatched_ids_are_not_found() {
    let h = harness().await;
    let workspaces = &h.repos.workspaces;

    let err = workspaces.get_workspace_by_id("does-not-exist").await.unwrap_err();
    assert_eq!(
        err,
        ControlPlaneError::ResourceNotFound {
            kind: ResourceKind::Workspace,
            id: "does-not-exist".to_string(),
        }
    );

    // A template stored in the resources container is not a workspace
    let template = h.repos.catalog.resolve("research-vm", None).await.unwrap();
    h.repos.resources.create(&template).await.unwrap();
    let err = workspaces.get_workspace_by_id(&template.id).await.unwrap_err();
    assert!(matches!(err, ControlPlaneError::ResourceNotFound { kind: ResourceKind::Workspace, .. }));

    let err = workspaces.get_deployed_workspace_by_id(&template.id).await.unwrap_err();
    assert!(matches!(err, ControlPlaneError::ResourceNotFound { .. }));
}

#[tokio::test]
async fn test_state_machine_end_to_end() {
    let h = harness().await;
    let workspaces = &h.repos.workspaces;

    let ws = workspaces.create_workspace(&research_vm("app-1")).await.unwrap();
    workspaces.save_workspace(&ws).await.unwrap();

    let err = workspaces
        .update_deployment_status(ws.id(), DeploymentStatus::Deleted, "skip ahead")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ControlPlaneError::InvalidStateTransition {
            from: DeploymentStatus::NotDeployed,
            to: DeploymentStatus::Deleted,
        }
    );
    let unchanged = workspaces.get_workspace_by_id(ws.id()).await.unwrap();
    assert_eq!(unchanged.status(), DeploymentStatus::NotDeployed);

    for status in [
        DeploymentStatus::Deploying,
        DeploymentStatus::Deployed,
        DeploymentStatus::Deleting,
        DeploymentStatus::Deleted,
    ] {
        let updated = workspaces
            .update_deployment_status(ws.id(), status, format!("{}", status))
            .await
            .unwrap();
        assert_eq!(updated.status(), status);
    }

    let stored = workspaces.get_workspace_by_id(ws.id()).await.unwrap();
    assert_eq!(stored.deployment().message(), "deleted");
    assert!(workspaces.get_active_workspaces().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_is_a_sink() {
    let h = harness().await;
    let workspaces = &h.repos.workspaces;

    let ws = workspaces.create_workspace(&research_vm("app-1")).await.unwrap();
    workspaces.save_workspace(&ws).await.unwrap();
    workspaces
        .update_deployment_status(ws.id(), DeploymentStatus::Deploying, "deploying")
        .await
        .unwrap();
    workspaces
        .update_deployment_status(ws.id(), DeploymentStatus::Failed, "quota exceeded")
        .await
        .unwrap();

    let err = workspaces
        .update_deployment_status(ws.id(), DeploymentStatus::Deploying, "retry")
        .await
        .unwrap_err();
    assert!(matches!(err, ControlPlaneError::InvalidStateTransition { .. }));

    // Failed workspaces still hold their address space
    assert_eq!(workspaces.get_active_workspaces().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_patch_only_changes_enabled() {
    let h = harness().await;
    let workspaces = &h.repos.workspaces;

    let ws = workspaces.create_workspace(&research_vm("app-1")).await.unwrap();
    workspaces.save_workspace(&ws).await.unwrap();

    // The orchestrator moves the status on after the caller read `ws`
    workspaces
        .update_deployment_status(ws.id(), DeploymentStatus::Deploying, "deploying")
        .await
        .unwrap();

    let patched = workspaces
        .patch_workspace(&ws, &WorkspacePatch { enabled: false })
        .await
        .unwrap();

    assert_eq!(patched.is_enabled(), Some(false));
    assert_eq!(patched.status(), DeploymentStatus::Deploying);
    assert_eq!(patched.id(), ws.id());
    assert_eq!(patched.resource_template_name(), ws.resource_template_name());
    assert_eq!(patched.resource_template_version(), ws.resource_template_version());

    let stored = workspaces.get_workspace_by_id(ws.id()).await.unwrap();
    assert_eq!(stored, patched);
}

#[tokio::test]
async fn test_save_workspace_twice_conflicts() {
    let h = harness().await;
    let workspaces = &h.repos.workspaces;

    let ws = workspaces.create_workspace(&research_vm("app-1")).await.unwrap();
    workspaces.save_workspace(&ws).await.unwrap();

    let err = workspaces.save_workspace(&ws).await.unwrap_err();
    assert!(matches!(err, ControlPlaneError::Store(_)));
}

#[tokio::test]
async fn test_address_space_exhaustion_and_release() {
    let h = harness_with(config("10.0.0.0/23")).await;
    let workspaces = &h.repos.workspaces;

    let mut saved = Vec::new();
    for app_id in ["app-1", "app-2"] {
        let ws = workspaces.create_workspace(&research_vm(app_id)).await.unwrap();
        workspaces.save_workspace(&ws).await.unwrap();
        saved.push(ws);
    }

    let err = workspaces.create_workspace(&research_vm("app-3")).await.unwrap_err();
    assert!(matches!(err, ControlPlaneError::AddressSpaceExhausted { prefix_length: 24, .. }));
    assert!(err.is_retryable_after_release());

    // Deleting a workspace frees its block
    let released = &saved[0];
    for status in [
        DeploymentStatus::Deploying,
        DeploymentStatus::Deployed,
        DeploymentStatus::Deleting,
        DeploymentStatus::Deleted,
    ] {
        workspaces
            .update_deployment_status(released.id(), status, status.as_str())
            .await
            .unwrap();
    }

    let ws = workspaces.create_workspace(&research_vm("app-3")).await.unwrap();
    assert_eq!(ws.address_space(), released.address_space());
}

#[tokio::test]
async fn test_find_address_space_conflicts() {
    let h = harness().await;
    let workspaces = &h.repos.workspaces;

    assert!(workspaces.find_address_space_conflicts().await.unwrap().is_empty());

    let supplied = [
        ("app-1", "10.1.0.0/16"),
        ("app-2", "10.1.4.0/24"),
        ("app-3", "10.2.0.0/24"),
        ("app-4", "not-a-cidr"),
    ];
    for (app_id, address_space) in supplied {
        let ws = workspaces
            .create_workspace(&request(
                "research-vm",
                &[("app_id", app_id.into()), ("address_space", address_space.into())],
            ))
            .await
            .unwrap();
        workspaces.save_workspace(&ws).await.unwrap();
    }

    let conflicts = workspaces.find_address_space_conflicts().await.unwrap();
    assert_eq!(conflicts.len(), 2);

    let overlapping: Vec<_> = conflicts
        .iter()
        .filter_map(|c| match c {
            AddressSpaceConflict::Overlap {
                first_address_space,
                second_address_space,
                ..
            } => {
                let mut pair = [first_address_space.as_str(), second_address_space.as_str()];
                pair.sort();
                Some(pair)
            }
            _ => None,
        })
        .collect();
    assert_eq!(overlapping, vec![["10.1.0.0/16", "10.1.4.0/24"]]);

    assert!(conflicts.iter().any(|c| matches!(
        c,
        AddressSpaceConflict::Invalid { address_space: Some(s), .. } if s == "not-a-cidr"
    )));
}

#[tokio::test]
async fn test_supplied_address_space_is_not_checked() {
    let h = harness().await;
    let workspaces = &h.repos.workspaces;

    let first = workspaces.create_workspace(&research_vm("app-1")).await.unwrap();
    workspaces.save_workspace(&first).await.unwrap();

    let duplicate = workspaces
        .create_workspace(&request(
            "research-vm",
            &[
                ("app_id", "app-2".into()),
                ("address_space", first.address_space().unwrap().into()),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(duplicate.address_space(), first.address_space());
}
