// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Auth
//!
//! Identity lookup used when a workspace is created. The credential record is
//! opaque to the control plane: it is resolved once, attached to the
//! workspace document and never modified afterwards.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Anti-corruption boundary to the identity provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Opaque credential-info record attached to a workspace
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthInformation(BTreeMap<String, String>);

impl AuthInformation {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self(entries)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AuthInformation {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Unknown application id '{0}'")]
    UnknownApplication(String),

    #[error("Application id must not be empty")]
    EmptyApplicationId,

    #[error("Identity provider error: {0}")]
    Provider(String),
}

/// Resolves an application id to its credential-info record
#[async_trait]
pub trait AuthResolver: Send + Sync {
    async fn extract_auth_information(&self, app_id: &str) -> Result<AuthInformation, AuthError>;
}
