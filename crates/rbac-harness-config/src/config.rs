// crates/rbac-harness-config/src/config.rs
// ============================================================================
// Module: RBAC Harness Configuration
// Description: Configuration loading and validation for the RBAC harness.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: role-aggregation, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section has defaults, so an empty file is a valid configuration.
//! Polling budgets are explicit per operation class: reads settle quickly,
//! while binding creation and deletion need longer budgets.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use role_aggregation::CLUSTER_ENGINE_API_GROUP;
use role_aggregation::MANAGEMENT_API_GROUP;
use role_aggregation::ManagementApiGroups;
use role_aggregation::ManagementResourceCatalog;
use role_aggregation::MaterializationPolicy;
use role_aggregation::PROJECT_ENGINE_API_GROUP;
use role_aggregation::RoleScope;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::env::EnvOverrides;
use crate::env::ProcessEnv;
use crate::env::read_var;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "rbac-harness.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "RBAC_HARNESS_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Smallest accepted poll interval in milliseconds.
pub const MIN_POLL_INTERVAL_MS: u64 = 50;
/// Largest accepted poll interval in milliseconds.
pub const MAX_POLL_INTERVAL_MS: u64 = 10_000;
/// Smallest accepted poll timeout in milliseconds.
pub const MIN_POLL_TIMEOUT_MS: u64 = 1_000;
/// Largest accepted poll timeout in milliseconds.
pub const MAX_POLL_TIMEOUT_MS: u64 = 15 * 60 * 1_000;
/// Maximum number of catalog entries per scope.
pub(crate) const MAX_CATALOG_ENTRIES: usize = 256;
/// Maximum length of a generated-name prefix.
pub const MAX_NAME_PREFIX_LENGTH: usize = 32;
/// Default generated-name prefix.
const DEFAULT_NAME_PREFIX: &str = "rbac";

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Root harness configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Polling budgets per operation class.
    #[serde(default)]
    pub convergence: ConvergenceConfig,
    /// Management resource catalog.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Materialization policy points.
    #[serde(default)]
    pub policy: MaterializationPolicy,
    /// Scenario naming settings.
    #[serde(default)]
    pub scenario: ScenarioConfig,
    /// Audit output settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl HarnessConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit path, then `RBAC_HARNESS_CONFIG`, then
    /// `rbac-harness.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = resolve_path(path)?;
        check_path("config path", &path)?;
        let file = fs::File::open(&path).map_err(|err| ConfigError::Io(err.to_string()))?;
        let mut content = String::new();
        let limit = u64::try_from(MAX_CONFIG_FILE_SIZE).unwrap_or(u64::MAX);
        file.take(limit.saturating_add(1))
            .read_to_string(&mut content)
            .map_err(|err| match err.kind() {
                io::ErrorKind::InvalidData => {
                    ConfigError::Invalid("config file must be utf-8".to_string())
                }
                _ => ConfigError::Io(err.to_string()),
            })?;
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "config file exceeds {MAX_CONFIG_FILE_SIZE} bytes"
            )));
        }
        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, override parsing, or validation fails.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        let overrides = EnvOverrides::load().map_err(ConfigError::Invalid)?;
        config.apply_overrides(&overrides);
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from TOML text without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the TOML is malformed.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment overrides.
    ///
    /// A timeout override raises every operation-class timeout to at least
    /// the given duration and never shortens one.
    pub fn apply_overrides(&mut self, overrides: &EnvOverrides) {
        if let Some(timeout) = overrides.timeout {
            self.convergence.raise_timeouts(timeout);
        }
        if let Some(prefix) = &overrides.name_prefix {
            self.scenario.name_prefix.clone_from(prefix);
        }
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.convergence.validate()?;
        self.catalog.validate()?;
        self.scenario.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Convergence
// ============================================================================

/// Operation classes with independent polling budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationClass {
    /// Reading objects that already exist or are derived from templates.
    Read,
    /// Waiting for bindings to materialize their grants.
    BindingCreate,
    /// Waiting for deletions to cascade.
    Deletion,
}

impl OperationClass {
    /// All operation classes.
    pub const ALL: [Self; 3] = [Self::Read, Self::BindingCreate, Self::Deletion];

    /// Returns a stable label for the class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::BindingCreate => "binding_create",
            Self::Deletion => "deletion",
        }
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded polling budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollBudget {
    /// Delay between polls in milliseconds.
    pub interval_ms: u64,
    /// Overall timeout in milliseconds.
    pub timeout_ms: u64,
}

impl PollBudget {
    /// Creates a budget from millisecond values.
    #[must_use]
    pub const fn new(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval_ms,
            timeout_ms,
        }
    }

    /// Returns the poll interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Returns the overall timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validates the budget bounds.
    fn validate(&self, class: OperationClass) -> Result<(), ConfigError> {
        if !(MIN_POLL_INTERVAL_MS ..= MAX_POLL_INTERVAL_MS).contains(&self.interval_ms) {
            return Err(ConfigError::Invalid(format!(
                "convergence.{class}.interval_ms must be between {MIN_POLL_INTERVAL_MS} and \
                 {MAX_POLL_INTERVAL_MS}"
            )));
        }
        if !(MIN_POLL_TIMEOUT_MS ..= MAX_POLL_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "convergence.{class}.timeout_ms must be between {MIN_POLL_TIMEOUT_MS} and \
                 {MAX_POLL_TIMEOUT_MS}"
            )));
        }
        if self.interval_ms >= self.timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "convergence.{class}.interval_ms must be less than timeout_ms"
            )));
        }
        Ok(())
    }
}

/// Polling budgets per operation class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConvergenceConfig {
    /// Budget for reads.
    #[serde(default = "default_read_budget")]
    pub read: PollBudget,
    /// Budget for binding materialization.
    #[serde(default = "default_binding_create_budget")]
    pub binding_create: PollBudget,
    /// Budget for deletion cascades.
    #[serde(default = "default_deletion_budget")]
    pub deletion: PollBudget,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            read: default_read_budget(),
            binding_create: default_binding_create_budget(),
            deletion: default_deletion_budget(),
        }
    }
}

impl ConvergenceConfig {
    /// Returns the budget for an operation class.
    #[must_use]
    pub const fn budget(&self, class: OperationClass) -> PollBudget {
        match class {
            OperationClass::Read => self.read,
            OperationClass::BindingCreate => self.binding_create,
            OperationClass::Deletion => self.deletion,
        }
    }

    /// Raises every timeout to at least `minimum`.
    pub fn raise_timeouts(&mut self, minimum: Duration) {
        let minimum_ms = u64::try_from(minimum.as_millis()).unwrap_or(u64::MAX);
        for budget in [&mut self.read, &mut self.binding_create, &mut self.deletion] {
            budget.timeout_ms = budget.timeout_ms.max(minimum_ms);
        }
    }

    /// Validates every budget.
    fn validate(&self) -> Result<(), ConfigError> {
        for class in OperationClass::ALL {
            self.budget(class).validate(class)?;
        }
        Ok(())
    }
}

/// Default budget for reads.
pub(crate) const fn default_read_budget() -> PollBudget {
    PollBudget::new(250, 30_000)
}

/// Default budget for binding materialization.
pub(crate) const fn default_binding_create_budget() -> PollBudget {
    PollBudget::new(1_000, 120_000)
}

/// Default budget for deletion cascades.
pub(crate) const fn default_deletion_budget() -> PollBudget {
    PollBudget::new(1_000, 120_000)
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Management resource catalog configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Management-plane API group.
    #[serde(default = "default_management_group")]
    pub management_group: String,
    /// Cluster provisioning engine API group.
    #[serde(default = "default_cluster_engine_group")]
    pub cluster_engine_group: String,
    /// Project engine API group.
    #[serde(default = "default_project_engine_group")]
    pub project_engine_group: String,
    /// Cluster-scope management resources mapped to their API group.
    #[serde(default = "default_cluster_resources")]
    pub cluster_resources: BTreeMap<String, String>,
    /// Project-scope management resources mapped to their API group.
    #[serde(default = "default_project_resources")]
    pub project_resources: BTreeMap<String, String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            management_group: default_management_group(),
            cluster_engine_group: default_cluster_engine_group(),
            project_engine_group: default_project_engine_group(),
            cluster_resources: default_cluster_resources(),
            project_resources: default_project_resources(),
        }
    }
}

impl CatalogConfig {
    /// Builds the catalog the classifier runs with.
    #[must_use]
    pub fn to_catalog(&self) -> ManagementResourceCatalog {
        ManagementResourceCatalog::new(
            self.groups(),
            self.cluster_resources.clone(),
            self.project_resources.clone(),
        )
    }

    /// Returns the configured API groups.
    fn groups(&self) -> ManagementApiGroups {
        ManagementApiGroups {
            management: self.management_group.clone(),
            cluster_engine: self.cluster_engine_group.clone(),
            project_engine: self.project_engine_group.clone(),
        }
    }

    /// Validates groups and resource tables.
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, group) in [
            ("catalog.management_group", &self.management_group),
            ("catalog.cluster_engine_group", &self.cluster_engine_group),
            ("catalog.project_engine_group", &self.project_engine_group),
        ] {
            if group.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
            }
        }
        let groups = self.groups();
        for (field, scope, table) in [
            ("catalog.cluster_resources", RoleScope::Cluster, &self.cluster_resources),
            ("catalog.project_resources", RoleScope::Project, &self.project_resources),
        ] {
            if table.is_empty() {
                return Err(ConfigError::Invalid(format!("{field} must not be empty")));
            }
            if table.len() > MAX_CATALOG_ENTRIES {
                return Err(ConfigError::Invalid(format!("{field} has too many entries")));
            }
            for (resource, group) in table {
                if resource.trim().is_empty() || resource == role_aggregation::WILDCARD {
                    return Err(ConfigError::Invalid(format!(
                        "{field} resource names must be non-empty and not a wildcard"
                    )));
                }
                if !groups.accepts(scope, group) {
                    return Err(ConfigError::Invalid(format!(
                        "{field}.{resource} uses api group '{group}' not accepted for {scope} scope"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Default management API group.
fn default_management_group() -> String {
    MANAGEMENT_API_GROUP.to_string()
}

/// Default cluster engine API group.
fn default_cluster_engine_group() -> String {
    CLUSTER_ENGINE_API_GROUP.to_string()
}

/// Default project engine API group.
fn default_project_engine_group() -> String {
    PROJECT_ENGINE_API_GROUP.to_string()
}

/// Default cluster-scope catalog.
fn default_cluster_resources() -> BTreeMap<String, String> {
    ManagementResourceCatalog::default().cluster
}

/// Default project-scope catalog.
fn default_project_resources() -> BTreeMap<String, String> {
    ManagementResourceCatalog::default().project
}

// ============================================================================
// SECTION: Scenario
// ============================================================================

/// Scenario naming configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Prefix of generated object names.
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name_prefix: default_name_prefix(),
        }
    }
}

impl ScenarioConfig {
    /// Validates the name prefix as a DNS-label fragment.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_name_prefix(&self.name_prefix)
    }
}

/// Default generated-name prefix.
fn default_name_prefix() -> String {
    DEFAULT_NAME_PREFIX.to_string()
}

/// Validates a generated-name prefix.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] unless the prefix is 1 to 32 lowercase
/// ASCII letters, digits, or hyphens starting with a letter.
pub fn validate_name_prefix(prefix: &str) -> Result<(), ConfigError> {
    if prefix.is_empty() || prefix.len() > MAX_NAME_PREFIX_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "scenario.name_prefix must be 1 to {MAX_NAME_PREFIX_LENGTH} characters"
        )));
    }
    let starts_with_letter = prefix.chars().next().is_some_and(|ch| ch.is_ascii_lowercase());
    let charset_ok =
        prefix.chars().all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-');
    if !starts_with_letter || !charset_ok {
        return Err(ConfigError::Invalid(
            "scenario.name_prefix must be lowercase alphanumerics or '-' starting with a letter"
                .to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Audit disabled.
    #[default]
    None,
}

/// Audit output configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink receiving audit events.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Audit log path for the file sink (JSON lines).
    #[serde(default)]
    pub path: Option<String>,
    /// Include raw rule sets next to their hashes (explicit opt-in).
    #[serde(default)]
    pub include_rules: bool,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (AuditSinkKind::File, Some(path)) => check_path("audit.path", Path::new(path.trim())),
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid for the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Picks the explicit path, then `RBAC_HARNESS_CONFIG`, then the default name.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    let from_env = read_var(&ProcessEnv, CONFIG_ENV_VAR).map_err(ConfigError::Invalid)?;
    Ok(from_env.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_NAME), PathBuf::from))
}

/// Enforces the total and per-component path length limits.
fn check_path(field: &str, path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let long_component = path
        .components()
        .any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH);
    if long_component {
        return Err(ConfigError::Invalid(format!("{field} path component too long")));
    }
    Ok(())
}
