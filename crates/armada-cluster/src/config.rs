//! Cluster configuration: defaults, environment templates, validation.
//!
//! Every function here returns a fresh value. There is no shared default
//! instance to mutate, so a caller editing one config can never leak into
//! another.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ClusterError;

/// Smallest health check interval a cluster may be configured with.
pub const MIN_HEALTH_CHECK_INTERVAL_SECS: u64 = 5;

/// Structural configuration of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub max_nodes: u32,
    pub max_tenants: u32,
    pub max_storage_gb: u64,
    pub backup_retention_days: u32,
    /// Advisory polling cadence for the caller's scheduler.
    pub health_check_interval_secs: u64,
    pub auto_scaling: bool,
    pub high_availability: bool,
    pub encryption: bool,
    pub monitoring: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            max_nodes: 10,
            max_tenants: 100,
            max_storage_gb: 1000,
            backup_retention_days: 30,
            health_check_interval_secs: 30,
            auto_scaling: false,
            high_availability: true,
            encryption: true,
            monitoring: true,
        }
    }
}

impl ClusterConfig {
    /// Returns the template for an environment.
    ///
    /// Encryption and monitoring stay on everywhere; the rest is sized
    /// for the environment.
    pub fn template(env: Environment) -> Self {
        let base = Self::default();
        match env {
            Environment::Development => Self {
                max_nodes: 3,
                max_tenants: 10,
                max_storage_gb: 100,
                backup_retention_days: 7,
                health_check_interval_secs: 60,
                auto_scaling: false,
                high_availability: false,
                ..base
            },
            Environment::Staging => Self {
                max_nodes: 5,
                max_tenants: 50,
                max_storage_gb: 500,
                backup_retention_days: 14,
                health_check_interval_secs: 30,
                auto_scaling: false,
                high_availability: true,
                ..base
            },
            Environment::Production => Self {
                max_nodes: 20,
                max_tenants: 1000,
                max_storage_gb: 10000,
                backup_retention_days: 90,
                health_check_interval_secs: 15,
                auto_scaling: true,
                high_availability: true,
                ..base
            },
        }
    }

    /// Parses a full config from TOML. Missing keys take default values.
    pub fn from_toml_str(input: &str) -> Result<Self, ClusterError> {
        toml::from_str(input).map_err(|e| ClusterError::Configuration(e.to_string()))
    }

    /// Reads a full config from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClusterError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ClusterError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Renders the config as TOML.
    pub fn to_toml(&self) -> Result<String, ClusterError> {
        toml::to_string_pretty(self).map_err(|e| ClusterError::Configuration(e.to_string()))
    }
}

/// Returns the baseline configuration.
pub fn default_config() -> ClusterConfig {
    ClusterConfig::default()
}

/// Returns the baseline with the environment's overrides applied.
pub fn config_template(env: Environment) -> ClusterConfig {
    ClusterConfig::template(env)
}

/// Deployment environment with a predefined template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub const ALL: [Environment; 3] = [
        Environment::Development,
        Environment::Staging,
        Environment::Production,
    ];
}

impl FromStr for Environment {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ClusterError::UnknownEnvironment(s.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// A configuration update where any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialClusterConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_nodes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tenants: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_storage_gb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_retention_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_interval_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_scaling: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_availability: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitoring: Option<bool>,
}

impl PartialClusterConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ClusterError> {
        toml::from_str(input).map_err(|e| ClusterError::Configuration(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClusterError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ClusterError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Checks every present field. See [`validate_config`].
    pub fn validate(&self) -> ConfigValidation {
        validate_config(self)
    }

    /// Overlays the present fields on a copy of `base`.
    pub fn apply_to(&self, base: &ClusterConfig) -> ClusterConfig {
        ClusterConfig {
            max_nodes: self.max_nodes.unwrap_or(base.max_nodes),
            max_tenants: self.max_tenants.unwrap_or(base.max_tenants),
            max_storage_gb: self.max_storage_gb.unwrap_or(base.max_storage_gb),
            backup_retention_days: self
                .backup_retention_days
                .unwrap_or(base.backup_retention_days),
            health_check_interval_secs: self
                .health_check_interval_secs
                .unwrap_or(base.health_check_interval_secs),
            auto_scaling: self.auto_scaling.unwrap_or(base.auto_scaling),
            high_availability: self.high_availability.unwrap_or(base.high_availability),
            encryption: self.encryption.unwrap_or(base.encryption),
            monitoring: self.monitoring.unwrap_or(base.monitoring),
        }
    }
}

impl From<ClusterConfig> for PartialClusterConfig {
    fn from(config: ClusterConfig) -> Self {
        Self {
            max_nodes: Some(config.max_nodes),
            max_tenants: Some(config.max_tenants),
            max_storage_gb: Some(config.max_storage_gb),
            backup_retention_days: Some(config.backup_retention_days),
            health_check_interval_secs: Some(config.health_check_interval_secs),
            auto_scaling: Some(config.auto_scaling),
            high_availability: Some(config.high_availability),
            encryption: Some(config.encryption),
            monitoring: Some(config.monitoring),
        }
    }
}

/// A single broken business rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigViolation {
    MaxNodesTooLow,
    MaxTenantsTooLow,
    MaxStorageTooLow,
    BackupRetentionTooLow,
    HealthCheckIntervalTooLow,
}

impl fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigViolation::MaxNodesTooLow => write!(f, "max_nodes must be at least 1"),
            ConfigViolation::MaxTenantsTooLow => write!(f, "max_tenants must be at least 1"),
            ConfigViolation::MaxStorageTooLow => write!(f, "max_storage_gb must be at least 1"),
            ConfigViolation::BackupRetentionTooLow => {
                write!(f, "backup_retention_days must be at least 1")
            }
            ConfigViolation::HealthCheckIntervalTooLow => write!(
                f,
                "health_check_interval_secs must be at least {MIN_HEALTH_CHECK_INTERVAL_SECS}"
            ),
        }
    }
}

/// Outcome of validating a partial config: every violation, not just the first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigValidation {
    pub is_valid: bool,
    pub errors: Vec<ConfigViolation>,
}

/// Validates the fields present in `partial`. Absent fields are skipped.
pub fn validate_config(partial: &PartialClusterConfig) -> ConfigValidation {
    let checks = [
        (
            partial.max_nodes.is_some_and(|v| v < 1),
            ConfigViolation::MaxNodesTooLow,
        ),
        (
            partial.max_tenants.is_some_and(|v| v < 1),
            ConfigViolation::MaxTenantsTooLow,
        ),
        (
            partial.max_storage_gb.is_some_and(|v| v < 1),
            ConfigViolation::MaxStorageTooLow,
        ),
        (
            partial.backup_retention_days.is_some_and(|v| v < 1),
            ConfigViolation::BackupRetentionTooLow,
        ),
        (
            partial
                .health_check_interval_secs
                .is_some_and(|v| v < MIN_HEALTH_CHECK_INTERVAL_SECS),
            ConfigViolation::HealthCheckIntervalTooLow,
        ),
    ];

    let errors: Vec<ConfigViolation> = checks
        .into_iter()
        .filter(|(violated, _)| *violated)
        .map(|(_, violation)| violation)
        .collect();

    ConfigValidation {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// Shallow merge of `partial` over the default config; partial wins.
pub fn merge_with_defaults(partial: &PartialClusterConfig) -> ClusterConfig {
    partial.apply_to(&ClusterConfig::default())
}
