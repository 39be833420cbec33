// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Static Auth Resolver
//!
//! Configuration-backed [`AuthResolver`]. It stands in for the identity
//! provider in development and tests: an application id resolves to a fixed
//! credential-info record derived from the id and the configured tenant.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements `AuthResolver` without an external provider

use async_trait::async_trait;
use std::collections::BTreeSet;
use crate::domain::auth::{AuthError, AuthInformation, AuthResolver};
use crate::domain::config::AuthConfig;

#[derive(Debug, Clone, Default)]
pub struct StaticAuthResolver {
    tenant_id: Option<String>,
    known_app_ids: BTreeSet<String>,
}

impl StaticAuthResolver {
    /// Resolver accepting any non-empty application id
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            tenant_id: config.tenant_id.clone(),
            known_app_ids: config.known_app_ids.iter().cloned().collect(),
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Restrict resolution to the given application ids
    pub fn with_known_app_ids<I, S>(mut self, app_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_app_ids = app_ids.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl AuthResolver for StaticAuthResolver {
    async fn extract_auth_information(&self, app_id: &str) -> Result<AuthInformation, AuthError> {
        let app_id = app_id.trim();
        if app_id.is_empty() {
            return Err(AuthError::EmptyApplicationId);
        }
        if !self.known_app_ids.is_empty() && !self.known_app_ids.contains(app_id) {
            return Err(AuthError::UnknownApplication(app_id.to_string()));
        }

        let mut entries = vec![
            ("app_id", app_id.to_string()),
            ("scope_id", format!("api://{}", app_id)),
        ];
        if let Some(tenant_id) = &self.tenant_id {
            entries.push(("tenant_id", tenant_id.clone()));
        }

        tracing::debug!(app_id, "Resolved auth information");
        Ok(entries.into_iter().collect())
    }
}
