// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Document Store Implementations
//!
//! Infrastructure implementations of the [`DocumentStore`] contract defined in
//! the domain layer.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve stored resource documents
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **InMemoryDocumentStore** - `parking_lot::RwLock` over per-container maps,
//!   for development and tests
//! - **PostgresDocumentStore** - one JSONB row per document, predicates
//!   rendered to parameterised SQL
//!
//! [`DocumentStore`]: crate::domain::repository::DocumentStore

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
