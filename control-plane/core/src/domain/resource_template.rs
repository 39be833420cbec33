// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Resource Templates
//!
//! A resource template is a named, versioned description of the parameters a
//! workspace type accepts. Templates are read-only catalog entries: they are
//! seeded once at bootstrap and a workspace binds to exactly one
//! `(name, version)` pair for its whole life.
//!
//! ## Parameter Merge
//!
//! [`ResourceTemplate::validate`] produces the merged parameter set, lowest
//! precedence first:
//!
//! | Source | Example |
//! |--------|---------|
//! | `parameterSchema.properties.*.default` | `vm_size: "Standard_D2s_v3"` |
//! | `defaultParameters` | `enabled: true` |
//! | caller-supplied parameters | `app_id: "..."` |
//!
//! System-reserved keys are layered on top by the workspace repository, never
//! here.

use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Merged parameter mapping stored on a workspace
pub type Parameters = BTreeMap<String, ParameterValue>;

/// Parameter value; any JSON value except `null`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Array(Vec<ParameterValue>),
    Object(BTreeMap<String, ParameterValue>),
}

impl ParameterValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{}", s),
            Self::Array(_) | Self::Object(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// JSON Schema over the merged parameter object of a template.
///
/// Stored and seeded verbatim as `parameterSchema`; every keyword the
/// `jsonschema` crate understands is enforced. An absent schema accepts any
/// object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSchema(Value);

impl Default for ParameterSchema {
    fn default() -> Self {
        Self(json!({ "type": "object" }))
    }
}

impl From<Value> for ParameterSchema {
    fn from(schema: Value) -> Self {
        Self(schema)
    }
}

impl ParameterSchema {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Names listed under the top-level `required` keyword
    pub fn required(&self) -> Vec<&str> {
        self.0
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// `properties.*.default` values, keyed by property name
    pub fn declared_defaults(&self) -> Result<Parameters, TemplateError> {
        let Some(properties) = self.0.get("properties").and_then(Value::as_object) else {
            return Ok(Parameters::new());
        };

        properties
            .iter()
            .filter_map(|(key, property)| property.get("default").map(|default| (key, default)))
            .map(|(key, default)| {
                let value: ParameterValue = serde_json::from_value(default.clone()).map_err(|e| {
                    TemplateError::InvalidDefinition(format!("default of '{}': {}", key, e))
                })?;
                Ok((key.clone(), value))
            })
            .collect()
    }

    fn compile(schema: &Value) -> Result<jsonschema::Validator, TemplateError> {
        jsonschema::validator_for(schema)
            .map_err(|e| TemplateError::InvalidDefinition(format!("invalid parameter schema: {}", e)))
    }

    /// Validate a parameter set, collecting every violation
    pub fn check(&self, parameters: &Parameters) -> Result<(), TemplateError> {
        Self::check_against(&self.0, parameters)
    }

    /// Like [`check`](Self::check) but ignoring `required`, for checking a
    /// partial set such as the template defaults.
    fn check_partial(&self, parameters: &Parameters) -> Result<(), TemplateError> {
        let mut relaxed = self.0.clone();
        if let Value::Object(keywords) = &mut relaxed {
            keywords.remove("required");
        }
        Self::check_against(&relaxed, parameters)
    }

    fn check_against(schema: &Value, parameters: &Parameters) -> Result<(), TemplateError> {
        let validator = Self::compile(schema)?;
        let instance = serde_json::to_value(parameters)
            .map_err(|e| TemplateError::SchemaViolation(e.to_string()))?;

        let violations: Vec<String> = validator
            .iter_errors(&instance)
            .map(|e| e.to_string())
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(TemplateError::SchemaViolation(violations.join("; ")))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Resource template '{name}' not found (version: {})", .version.as_deref().unwrap_or("latest"))]
    NotFound { name: String, version: Option<String> },

    #[error("Invalid template version '{value}': {reason}")]
    InvalidVersion { value: String, reason: String },

    #[error("Parameters violate the template schema: {0}")]
    SchemaViolation(String),

    #[error("Invalid template definition: {0}")]
    InvalidDefinition(String),
}

/// Parse a semantic version string such as `0.1.0`
pub fn parse_version(value: &str) -> Result<Version, TemplateError> {
    Version::parse(value.trim()).map_err(|e| TemplateError::InvalidVersion {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Stable document id for a `(name, version)` pair
pub fn template_document_id(name: &str, version: &Version) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{}:{}", name, version).as_bytes()).to_string()
}

/// Read-only resource template catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplate {
    pub id: String,
    pub name: String,
    pub version: Version,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub parameter_schema: ParameterSchema,

    #[serde(default)]
    pub default_parameters: Parameters,
}

impl ResourceTemplate {
    pub fn new(
        name: impl Into<String>,
        version: Version,
        parameter_schema: ParameterSchema,
        default_parameters: Parameters,
    ) -> Self {
        let name = name.into();
        Self {
            id: template_document_id(&name, &version),
            name,
            version,
            description: None,
            parameter_schema,
            default_parameters,
        }
    }

    /// Check the template is self-consistent: a name, a schema that
    /// compiles, and defaults that satisfy it.
    pub fn validate_definition(&self) -> Result<(), TemplateError> {
        if self.name.trim().is_empty() {
            return Err(TemplateError::InvalidDefinition(
                "template name cannot be empty".to_string(),
            ));
        }

        let defaults = self.merged_defaults()?;
        self.parameter_schema.check_partial(&defaults).map_err(|e| {
            TemplateError::InvalidDefinition(format!("{} {}: {}", self.name, self.version, e))
        })
    }

    fn merged_defaults(&self) -> Result<Parameters, TemplateError> {
        let mut merged = self.parameter_schema.declared_defaults()?;
        merged.extend(self.default_parameters.clone());
        Ok(merged)
    }

    /// Validate caller input against the parameter schema and return the
    /// merged parameter set.
    ///
    /// The schema is applied to the merged set, so a required parameter may
    /// be satisfied by a default. Keys the schema does not mention pass
    /// through unless it sets `additionalProperties: false`.
    pub fn validate(&self, input: &Parameters) -> Result<Parameters, TemplateError> {
        let mut merged = self.merged_defaults()?;
        merged.extend(input.clone());
        self.parameter_schema.check(&merged)?;
        Ok(merged)
    }
}

// ============================================================================
// Tests
// ============================================================================
