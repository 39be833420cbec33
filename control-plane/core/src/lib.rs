// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Workbench Control Plane Core
//!
//! Workspace lifecycle and resource allocation for the workbench control plane.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Template resolution, address-space allocation and the
//!   workspace deployment state machine over a partitioned document store

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
