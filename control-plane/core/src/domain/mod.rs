// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Workspace aggregate, resource templates, address-space allocation and the
//! interfaces of the external collaborators (document store, auth resolver).
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure model; no I/O beyond the collaborator traits

pub mod address_space;
pub mod auth;
pub mod config;
pub mod error;
pub mod repository;
pub mod resource;
pub mod resource_template;
pub mod workspace;
