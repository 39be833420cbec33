// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Document Store Interface
//!
//! Persistence contract for the partitioned document store that holds
//! workspaces and resource templates. The interface is defined here in the
//! domain layer and implemented in `crate::infrastructure::repositories`.
//!
//! | Operation | Semantics |
//! |-----------|-----------|
//! | `ensure_container` | Idempotent; an existing container is never altered |
//! | `query` | Store-side filtered read by [`Predicate`] |
//! | `read` | Point read by id |
//! | `create` | Conditional: fails with `Conflict` if the id exists |
//! | `replace` | Last-writer-wins; fails with `NotFound` if the id is absent |
//! | `patch_field` | In-place write of one field; the rest of the body is untouched |
//!
//! ## Storage Backend Abstraction
//!
//! The concrete store is selected at start-up from configuration. The
//! in-memory store serves development and tests; the PostgreSQL store keeps
//! each document as a JSONB row.
//!
//! Implementations must give read-your-writes consistency within a
//! partition. No multi-document transactions are assumed.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub connection_string: String,
}

/// Container provisioning parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    /// JSON pointer to the partition key inside each document, e.g. `/id`
    pub partition_key_path: String,
    pub throughput: u32,
}

impl ContainerSpec {
    pub fn new(name: impl Into<String>, partition_key_path: impl Into<String>, throughput: u32) -> Self {
        Self {
            name: name.into(),
            partition_key_path: partition_key_path.into(),
            throughput,
        }
    }

    /// Extract the partition key value of a document
    pub fn partition_key_of(&self, body: &Value) -> Result<String, RepositoryError> {
        match body.pointer(&self.partition_key_path) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(RepositoryError::Serialization(format!(
                "document has no partition key at '{}'",
                self.partition_key_path
            ))),
        }
    }
}

/// Outcome of [`DocumentStore::ensure_container`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Created,
    AlreadyExists,
}

/// A document ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub partition_key: String,
    pub body: Value,
}

// ============================================================================
// Query Predicates
// ============================================================================

/// Store-side filter over document fields.
///
/// Fields are dotted paths into the document (`deployment.status`). A
/// comparison against a missing field never matches, for `Eq` and `Ne`
/// alike, which mirrors SQL `NULL` semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    All,
    Eq { field: String, value: Value },
    Ne { field: String, value: Value },
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Conjunction, flattening nested `And`s and dropping `All`
    pub fn and(self, other: Predicate) -> Self {
        let mut clauses = Vec::new();
        for p in [self, other] {
            match p {
                Self::All => {}
                Self::And(inner) => clauses.extend(inner),
                clause => clauses.push(clause),
            }
        }
        match clauses.len() {
            0 => Self::All,
            1 => clauses.remove(0),
            _ => Self::And(clauses),
        }
    }

    /// Evaluate against a document body
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Self::All => true,
            Self::Eq { field, value } => lookup(document, field).is_some_and(|v| v == value),
            Self::Ne { field, value } => lookup(document, field).is_some_and(|v| v != value),
            Self::And(clauses) => clauses.iter().all(|c| c.matches(document)),
        }
    }

    fn fmt_clause(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("true"),
            Self::Eq { field, value } => write!(f, "c.{} = {}", field, value),
            Self::Ne { field, value } => write!(f, "c.{} != {}", field, value),
            Self::And(clauses) => {
                for (i, clause) in clauses.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" AND ")?;
                    }
                    clause.fmt_clause(f)?;
                }
                Ok(())
            }
        }
    }
}

/// Resolve a dotted field path inside a document
pub fn lookup<'a>(document: &'a Value, field: &str) -> Option<&'a Value> {
    field
        .split('.')
        .try_fold(document, |current, segment| current.get(segment))
}

/// Set a dotted field path inside a document. Only the last segment is
/// created when missing; returns `false` and leaves the document unchanged
/// when an intermediate object is absent.
pub fn set_field(document: &mut Value, field: &str, value: Value) -> bool {
    let (parent, leaf) = match field.rsplit_once('.') {
        Some((parent, leaf)) => (
            parent
                .split('.')
                .try_fold(document, |current, segment| current.get_mut(segment)),
            leaf,
        ),
        None => (Some(document), field),
    };

    match parent.and_then(Value::as_object_mut) {
        Some(object) => {
            object.insert(leaf.to_string(), value);
            true
        }
        None => false,
    }
}

impl fmt::Display for Predicate {
    /// SQL-like rendering used in logs
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT * FROM c")?;
        if matches!(self, Self::All) {
            return Ok(());
        }
        f.write_str(" WHERE ")?;
        self.fmt_clause(f)
    }
}

// ============================================================================
// Store Interface
// ============================================================================

/// Partitioned document collection keyed by `id`
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the container if absent; never alters an existing one
    async fn ensure_container(&self, spec: &ContainerSpec) -> Result<ContainerStatus, RepositoryError>;

    async fn container_exists(&self, name: &str) -> Result<bool, RepositoryError>;

    /// Filtered read; result order is store order
    async fn query(&self, container: &str, predicate: &Predicate) -> Result<Vec<Value>, RepositoryError>;

    async fn read(&self, container: &str, id: &str) -> Result<Option<Value>, RepositoryError>;

    /// Create-if-absent
    async fn create(&self, container: &str, document: StoredDocument) -> Result<(), RepositoryError>;

    /// Overwrite an existing document
    async fn replace(&self, container: &str, document: StoredDocument) -> Result<(), RepositoryError>;

    /// Atomically set one dotted field of an existing document, see
    /// [`set_field`]. Returns the updated body, or `None` if the id is absent.
    async fn patch_field(
        &self,
        container: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<Option<Value>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Entity already exists: {0}")]
    Conflict(String),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
