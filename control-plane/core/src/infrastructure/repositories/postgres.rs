// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Postgres Document Store
//!
//! Keeps every container as a row of `document_containers` and every
//! document as a JSONB row of `documents`, keyed by `(container, id)`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements `DocumentStore` on PostgreSQL

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPool};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{Postgres, Row};
use crate::domain::repository::{
    ContainerSpec, ContainerStatus, DocumentStore, Predicate, RepositoryError, StoredDocument,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS document_containers (
        name TEXT PRIMARY KEY,
        partition_key_path TEXT NOT NULL,
        throughput INTEGER NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        container TEXT NOT NULL REFERENCES document_containers(name),
        id TEXT NOT NULL,
        partition_key TEXT NOT NULL,
        body JSONB NOT NULL,
        PRIMARY KEY (container, id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS documents_partition_idx ON documents (container, partition_key)",
];

/// Postgres SQLSTATE for foreign key violations
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Bind value of a rendered predicate
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SqlBind {
    Path(Vec<String>),
    Value(Value),
}

/// Render a predicate as a SQL condition over `body`, numbering placeholders
/// from `first_placeholder`.
///
/// Comparisons go through `body #> path`, so a missing field yields `NULL`
/// and matches neither `=` nor `<>`.
pub(crate) fn render_predicate(predicate: &Predicate, first_placeholder: usize) -> (String, Vec<SqlBind>) {
    let mut binds = Vec::new();
    let sql = render_clause(predicate, first_placeholder, &mut binds);
    (sql, binds)
}

fn render_comparison(field: &str, value: &Value, op: &str, first: usize, binds: &mut Vec<SqlBind>) -> String {
    let path_slot = first + binds.len();
    binds.push(SqlBind::Path(field_path(field)));
    let value_slot = first + binds.len();
    binds.push(SqlBind::Value(value.clone()));
    format!("(body #> ${}::text[]) {} ${}::jsonb", path_slot, op, value_slot)
}

fn render_clause(predicate: &Predicate, first: usize, binds: &mut Vec<SqlBind>) -> String {
    match predicate {
        Predicate::All => "TRUE".to_string(),
        Predicate::Eq { field, value } => render_comparison(field, value, "=", first, binds),
        Predicate::Ne { field, value } => render_comparison(field, value, "<>", first, binds),
        Predicate::And(clauses) => {
            let parts: Vec<String> = clauses
                .iter()
                .map(|c| render_clause(c, first, binds))
                .collect();
            format!("({})", parts.join(" AND "))
        }
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    binds: Vec<SqlBind>,
) -> Query<'q, Postgres, PgArguments> {
    for bind in binds {
        query = match bind {
            SqlBind::Path(path) => query.bind(path),
            SqlBind::Value(value) => query.bind(Json(value)),
        };
    }
    query
}

fn throughput_column(spec: &ContainerSpec) -> Result<i32, RepositoryError> {
    i32::try_from(spec.throughput).map_err(|_| {
        RepositoryError::Database(format!(
            "Throughput {} of container '{}' exceeds the INTEGER column range",
            spec.throughput, spec.name
        ))
    })
}

fn field_path(field: &str) -> Vec<String> {
    field.split('.').map(str::to_string).collect()
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == FOREIGN_KEY_VIOLATION)
}

pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing tables if they do not exist
    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| RepositoryError::Database(format!("Failed to apply schema: {}", e)))?;
        }
        Ok(())
    }

    async fn require_container(&self, name: &str) -> Result<(), RepositoryError> {
        if self.container_exists(name).await? {
            Ok(())
        } else {
            Err(RepositoryError::ContainerNotFound(name.to_string()))
        }
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn ensure_container(&self, spec: &ContainerSpec) -> Result<ContainerStatus, RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO document_containers (name, partition_key_path, throughput)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(&spec.name)
        .bind(&spec.partition_key_path)
        .bind(throughput_column(spec)?)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to create container: {}", e)))?;

        if result.rows_affected() == 1 {
            Ok(ContainerStatus::Created)
        } else {
            Ok(ContainerStatus::AlreadyExists)
        }
    }

    async fn container_exists(&self, name: &str) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM document_containers WHERE name = $1)")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn query(&self, container: &str, predicate: &Predicate) -> Result<Vec<Value>, RepositoryError> {
        self.require_container(container).await?;

        let (condition, binds) = render_predicate(predicate, 2);
        let sql = format!(
            "SELECT body FROM documents WHERE container = $1 AND {} ORDER BY id",
            condition
        );
        tracing::debug!(container, query = %predicate, "Querying documents");

        let rows = bind_all(sqlx::query(&sql).bind(container), binds)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let Json(body): Json<Value> = row.try_get("body")?;
                Ok(body)
            })
            .collect()
    }

    async fn read(&self, container: &str, id: &str) -> Result<Option<Value>, RepositoryError> {
        self.require_container(container).await?;

        let row = sqlx::query("SELECT body FROM documents WHERE container = $1 AND id = $2")
            .bind(container)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        match row {
            Some(row) => {
                let Json(body): Json<Value> = row.try_get("body")?;
                Ok(Some(body))
            }
            None => Ok(None),
        }
    }

    async fn create(&self, container: &str, document: StoredDocument) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO documents (container, id, partition_key, body)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (container, id) DO NOTHING
            "#,
        )
        .bind(container)
        .bind(&document.id)
        .bind(&document.partition_key)
        .bind(Json(&document.body))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                RepositoryError::ContainerNotFound(container.to_string())
            } else {
                RepositoryError::Database(format!("Failed to create document: {}", e))
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(document.id));
        }
        Ok(())
    }

    async fn replace(&self, container: &str, document: StoredDocument) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET partition_key = $3, body = $4
            WHERE container = $1 AND id = $2
            "#,
        )
        .bind(container)
        .bind(&document.id)
        .bind(&document.partition_key)
        .bind(Json(&document.body))
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to replace document: {}", e)))?;

        if result.rows_affected() == 0 {
            self.require_container(container).await?;
            return Err(RepositoryError::NotFound(document.id));
        }
        Ok(())
    }

    async fn patch_field(
        &self,
        container: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<Option<Value>, RepositoryError> {
        // jsonb_set creates only the last path segment, like set_field
        let row = sqlx::query(
            r#"
            UPDATE documents
            SET body = jsonb_set(body, $3::text[], $4::jsonb, true)
            WHERE container = $1 AND id = $2
            RETURNING body
            "#,
        )
        .bind(container)
        .bind(id)
        .bind(field_path(field))
        .bind(Json(value))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to patch document: {}", e)))?;

        match row {
            Some(row) => {
                let Json(body): Json<Value> = row.try_get("body")?;
                Ok(Some(body))
            }
            None => {
                self.require_container(container).await?;
                Ok(None)
            }
        }
    }
}
