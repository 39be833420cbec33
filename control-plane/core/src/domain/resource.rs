// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Resource
//!
//! Tagged representation of every document kind the control plane stores.
//! Each stored document carries a `resourceType` discriminator and is decoded
//! through [`ResourceDocument`], so a read can tell "absent" apart from "present
//! but of another kind".
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Stored-document discriminated union

use serde::{Deserialize, Serialize};
use std::fmt;
use crate::domain::resource_template::ResourceTemplate;
use crate::domain::workspace::Workspace;

/// Name of the discriminator field in stored documents
pub const RESOURCE_KIND_FIELD: &str = "resourceType";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Workspace,
    ResourceTemplate,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::ResourceTemplate => "resource_template",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored document, tagged by `resourceType`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resourceType", rename_all = "snake_case")]
pub enum ResourceDocument {
    Workspace(Workspace),
    ResourceTemplate(ResourceTemplate),
}

impl ResourceDocument {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Workspace(_) => ResourceKind::Workspace,
            Self::ResourceTemplate(_) => ResourceKind::ResourceTemplate,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Workspace(w) => w.id(),
            Self::ResourceTemplate(t) => &t.id,
        }
    }
}

/// A typed resource that round-trips through [`ResourceDocument`]
pub trait Resource: Sized + Clone + Send + Sync {
    const KIND: ResourceKind;

    fn id(&self) -> &str;

    fn to_document(&self) -> ResourceDocument;

    /// `None` when the document is of another kind
    fn from_document(document: ResourceDocument) -> Option<Self>;
}

impl Resource for Workspace {
    const KIND: ResourceKind = ResourceKind::Workspace;

    fn id(&self) -> &str {
        Workspace::id(self)
    }

    fn to_document(&self) -> ResourceDocument {
        ResourceDocument::Workspace(self.clone())
    }

    fn from_document(document: ResourceDocument) -> Option<Self> {
        match document {
            ResourceDocument::Workspace(w) => Some(w),
            _ => None,
        }
    }
}

impl Resource for ResourceTemplate {
    const KIND: ResourceKind = ResourceKind::ResourceTemplate;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_document(&self) -> ResourceDocument {
        ResourceDocument::ResourceTemplate(self.clone())
    }

    fn from_document(document: ResourceDocument) -> Option<Self> {
        match document {
            ResourceDocument::ResourceTemplate(t) => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::auth::AuthInformation;
    use crate::domain::resource_template::{ParameterSchema, Parameters};
    use semver::Version;

    #[test]
    fn test_document_carries_discriminator() {
        let ws = Workspace::new(
            "ws-1",
            "research-vm",
            Version::new(0, 1, 0),
            Parameters::new(),
            AuthInformation::default(),
        );

        let body = serde_json::to_value(ws.to_document()).unwrap();
        assert_eq!(body[RESOURCE_KIND_FIELD], "workspace");
        assert_eq!(body["id"], "ws-1");

        let decoded: ResourceDocument = serde_json::from_value(body).unwrap();
        assert_eq!(decoded.kind(), ResourceKind::Workspace);
        assert_eq!(Workspace::from_document(decoded), Some(ws));
    }

    #[test]
    fn test_from_document_rejects_other_kind() {
        let template = ResourceTemplate::new(
            "research-vm",
            Version::new(0, 1, 0),
            ParameterSchema::default(),
            Parameters::new(),
        );

        let doc = template.to_document();
        assert_eq!(doc.kind(), ResourceKind::ResourceTemplate);
        assert_eq!(doc.id(), template.id);
        assert!(Workspace::from_document(doc).is_none());
    }
}
