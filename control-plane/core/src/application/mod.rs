// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod bootstrap;
pub mod repository_factory;
pub mod resource_repository;
pub mod template_catalog;
pub mod workspace_repository;

// Re-export services for convenience
pub use bootstrap::{bootstrap_state_store, BootstrapReport};
pub use repository_factory::{create_document_store, create_repositories, Repositories};
pub use resource_repository::ResourceRepository;
pub use template_catalog::TemplateCatalog;
pub use workspace_repository::{AddressSpaceConflict, WorkspaceRepository, WorkspaceSettings};
