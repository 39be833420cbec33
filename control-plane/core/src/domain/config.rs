// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Control Plane Configuration Types
//
// Defines the configuration manifest for a workbench control plane instance:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Deployment identity and region (system-reserved workspace parameters)
// - State store backend and container names
// - Address pool for workspace networks
// - Template seed source and auth resolver settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use crate::domain::address_space::{
    parse_address_space, AddressSpaceAllocator, DEFAULT_ADDRESS_POOL, DEFAULT_PREFIX_LENGTH,
};
use crate::domain::repository::{ContainerSpec, PostgresConfig, StorageBackend};

pub const CONFIG_API_VERSION: &str = "workbench/v1";
pub const CONFIG_KIND: &str = "ControlPlaneConfig";

/// Largest container throughput the state store can record
pub const MAX_THROUGHPUT: u32 = i32::MAX as u32;

/// Top-level Kubernetes-style control plane configuration manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPlaneConfigManifest {
    /// API version (must be "workbench/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ControlPlaneConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: ControlPlaneConfigSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlPlaneConfigSpec {
    #[serde(default)]
    pub deployment: DeploymentConfig,

    #[serde(default)]
    pub state_store: StateStoreConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub templates: TemplatesConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

/// Identity of this control plane deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Deployment id, stamped on every workspace as `tre_id`
    #[serde(default = "default_deployment_id")]
    pub id: String,

    /// Region workspaces are deployed into, stamped as `location`
    #[serde(default = "default_location")]
    pub location: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StateStoreBackend {
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateStoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StateStoreBackend,

    /// Connection string (postgres backend only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,

    #[serde(default = "default_resources_container")]
    pub resources_container: String,

    #[serde(default = "default_templates_container")]
    pub templates_container: String,

    /// Provisioned throughput for newly created containers, `1..=i32::MAX`
    #[serde(default = "default_throughput")]
    pub throughput: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Base pool workspace address spaces are carved from
    #[serde(default = "default_address_pool")]
    pub address_pool: String,

    #[serde(default = "default_prefix_length")]
    pub default_prefix_length: u8,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Canonical template seed file; the bundled seed is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// When non-empty, only these application ids resolve
    #[serde(default)]
    pub known_app_ids: Vec<String>,
}

fn default_deployment_id() -> String {
    "workbench".to_string()
}

fn default_location() -> String {
    "westeurope".to_string()
}

fn default_backend() -> StateStoreBackend {
    StateStoreBackend::InMemory
}

fn default_resources_container() -> String {
    "resources".to_string()
}

fn default_templates_container() -> String {
    "resourceTemplates".to_string()
}

fn default_throughput() -> u32 {
    400
}

fn default_address_pool() -> String {
    DEFAULT_ADDRESS_POOL.to_string()
}

fn default_prefix_length() -> u8 {
    DEFAULT_PREFIX_LENGTH
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            id: default_deployment_id(),
            location: default_location(),
        }
    }
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            connection_string: None,
            resources_container: default_resources_container(),
            templates_container: default_templates_container(),
            throughput: default_throughput(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            address_pool: default_address_pool(),
            default_prefix_length: default_prefix_length(),
        }
    }
}

impl Default for ControlPlaneConfigManifest {
    fn default() -> Self {
        Self {
            api_version: CONFIG_API_VERSION.to_string(),
            kind: CONFIG_KIND.to_string(),
            metadata: ManifestMetadata {
                name: "workbench".to_string(),
                labels: None,
            },
            spec: ControlPlaneConfigSpec::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid apiVersion: '{0}'. Must be 'workbench/v1'")]
    InvalidApiVersion(String),

    #[error("Invalid kind: '{0}'. Must be 'ControlPlaneConfig'")]
    InvalidKind(String),

    #[error("Invalid address pool '{0}': {1}")]
    InvalidAddressPool(String, String),

    #[error("Default prefix length /{prefix_length} must be between /{pool_prefix} and /32")]
    InvalidPrefixLength { prefix_length: u8, pool_prefix: u8 },

    #[error("Container name for {0} cannot be empty")]
    EmptyContainerName(&'static str),

    #[error("Throughput {0} must be between 1 and 2147483647")]
    InvalidThroughput(u32),

    #[error("Postgres backend requires spec.state_store.connection_string")]
    MissingConnectionString,

    #[error("Deployment {0} cannot be empty")]
    EmptyDeploymentField(&'static str),
}

impl ControlPlaneConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. WORKBENCH_CONFIG_PATH environment variable
    /// 2. ./workbench-config.yaml (working directory)
    /// 3. ~/.workbench/config.yaml (user home)
    /// 4. /etc/workbench/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("WORKBENCH_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./workbench-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".workbench").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/workbench/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path (fail if missing/invalid)
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("WORKBENCH_DATABASE_URL") {
            tracing::info!("Environment override: WORKBENCH_DATABASE_URL (postgres backend)");
            self.spec.state_store.backend = StateStoreBackend::Postgres;
            self.spec.state_store.connection_string = Some(url);
        }

        if let Some(location) = lookup("WORKBENCH_LOCATION") {
            tracing::info!("Environment override: WORKBENCH_LOCATION={}", location);
            self.spec.deployment.location = location;
        }

        if let Some(pool) = lookup("WORKBENCH_ADDRESS_POOL") {
            tracing::info!("Environment override: WORKBENCH_ADDRESS_POOL={}", pool);
            self.spec.network.address_pool = pool;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_version != CONFIG_API_VERSION {
            return Err(ConfigError::InvalidApiVersion(self.api_version.clone()));
        }

        if self.kind != CONFIG_KIND {
            return Err(ConfigError::InvalidKind(self.kind.clone()));
        }

        let deployment = &self.spec.deployment;
        if deployment.id.trim().is_empty() {
            return Err(ConfigError::EmptyDeploymentField("id"));
        }
        if deployment.location.trim().is_empty() {
            return Err(ConfigError::EmptyDeploymentField("location"));
        }

        let network = &self.spec.network;
        let pool = parse_address_space(&network.address_pool)
            .map_err(|e| ConfigError::InvalidAddressPool(network.address_pool.clone(), e.to_string()))?;
        if network.default_prefix_length < pool.prefix() || network.default_prefix_length > 32 {
            return Err(ConfigError::InvalidPrefixLength {
                prefix_length: network.default_prefix_length,
                pool_prefix: pool.prefix(),
            });
        }

        let store = &self.spec.state_store;
        if store.resources_container.trim().is_empty() {
            return Err(ConfigError::EmptyContainerName("resources"));
        }
        if store.templates_container.trim().is_empty() {
            return Err(ConfigError::EmptyContainerName("resource templates"));
        }
        if store.throughput == 0 || store.throughput > MAX_THROUGHPUT {
            return Err(ConfigError::InvalidThroughput(store.throughput));
        }
        if store.backend == StateStoreBackend::Postgres && store.connection_string.is_none() {
            return Err(ConfigError::MissingConnectionString);
        }

        Ok(())
    }

    pub fn storage_backend(&self) -> Result<StorageBackend, ConfigError> {
        match self.spec.state_store.backend {
            StateStoreBackend::InMemory => Ok(StorageBackend::InMemory),
            StateStoreBackend::Postgres => {
                let connection_string = self
                    .spec
                    .state_store
                    .connection_string
                    .clone()
                    .ok_or(ConfigError::MissingConnectionString)?;
                Ok(StorageBackend::PostgreSQL(PostgresConfig { connection_string }))
            }
        }
    }

    pub fn address_space_allocator(&self) -> Result<AddressSpaceAllocator, ConfigError> {
        let network = &self.spec.network;
        AddressSpaceAllocator::from_cidr(&network.address_pool)
            .and_then(|a| a.with_default_prefix_length(network.default_prefix_length))
            .map_err(|e| ConfigError::InvalidAddressPool(network.address_pool.clone(), e.to_string()))
    }

    /// Workspace container: partitioned by `/id`
    pub fn resources_container(&self) -> ContainerSpec {
        let store = &self.spec.state_store;
        ContainerSpec::new(store.resources_container.clone(), "/id", store.throughput)
    }

    /// Template container: partitioned by `/id`
    pub fn templates_container(&self) -> ContainerSpec {
        let store = &self.spec.state_store;
        ContainerSpec::new(store.templates_container.clone(), "/id", store.throughput)
    }
}

// ============================================================================
// Tests
// ============================================================================
