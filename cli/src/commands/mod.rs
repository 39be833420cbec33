// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the workbench CLI

pub mod address_space;
pub mod bootstrap;
pub mod config;
pub mod workspace;

pub use self::address_space::AddressSpaceCommand;
pub use self::config::ConfigCommand;
pub use self::workspace::WorkspaceCommand;
