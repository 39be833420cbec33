// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Template Seed
//!
//! Loads the canonical resource template collection consumed once at
//! bootstrap. The seed is a JSON document of the form
//! `{"templates": [{name, version, parameterSchema, defaultParameters}]}`.
//! A copy ships with the crate and is used when no seed file is configured.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use crate::domain::resource_template::{
    parse_version, ParameterSchema, Parameters, ResourceTemplate, TemplateError,
};

const BUNDLED_SEED: &str = include_str!("../../bootstrapping_data/resource_templates.json");

#[derive(Debug, Error)]
pub enum TemplateSeedError {
    #[error("Failed to read template seed {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse template seed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid template in seed: {0}")]
    Template(#[from] TemplateError),

    #[error("Duplicate template in seed: {name} {version}")]
    Duplicate { name: String, version: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSeedEntry {
    pub name: String,
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub parameter_schema: ParameterSchema,

    #[serde(default)]
    pub default_parameters: Parameters,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateSeed {
    pub templates: Vec<TemplateSeedEntry>,
}

impl TemplateSeed {
    /// Seed shipped with the crate
    pub fn bundled() -> Result<Self, TemplateSeedError> {
        Self::from_json_str(BUNDLED_SEED)
    }

    pub fn from_json_str(json: &str) -> Result<Self, TemplateSeedError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TemplateSeedError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| TemplateSeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Load from `path` when given, else the bundled seed
    pub fn load(path: Option<&Path>) -> Result<Self, TemplateSeedError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::bundled(),
        }
    }

    /// Convert every entry to a catalog template, checking each definition.
    /// Any invalid or duplicated entry fails the whole seed.
    pub fn into_templates(self) -> Result<Vec<ResourceTemplate>, TemplateSeedError> {
        let mut seen = HashSet::new();
        let mut templates = Vec::with_capacity(self.templates.len());

        for entry in self.templates {
            let version = parse_version(&entry.version)?;
            if !seen.insert((entry.name.clone(), version.clone())) {
                return Err(TemplateSeedError::Duplicate {
                    name: entry.name,
                    version: version.to_string(),
                });
            }

            let mut template =
                ResourceTemplate::new(entry.name, version, entry.parameter_schema, entry.default_parameters);
            template.description = entry.description;
            template.validate_definition()?;
            templates.push(template);
        }

        Ok(templates)
    }
}
