// crates/rbac-harness-config/src/env.rs
// ============================================================================
// Module: Harness Environment
// Description: Environment-backed overrides for harness configuration.
// Purpose: Read override variables through a swappable lookup.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Overrides are read through an [`EnvLookup`] so the process environment
//! can be replaced by a fixed table. A variable that is set must be UTF-8 and
//! non-blank once trimmed; anything else is an error rather than a silent
//! fallback to the default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::time::Duration;

use crate::config::CONFIG_ENV_VAR;
use crate::config::MAX_POLL_TIMEOUT_MS;
use crate::config::validate_name_prefix;

// ============================================================================
// SECTION: Variables
// ============================================================================

/// Environment keys read by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnv {
    /// Config file path.
    Config,
    /// Timeout floor in seconds applied to every operation class.
    TimeoutSeconds,
    /// Prefix for generated object names.
    NamePrefix,
}

impl HarnessEnv {
    /// Variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => CONFIG_ENV_VAR,
            Self::TimeoutSeconds => "RBAC_HARNESS_TIMEOUT_SEC",
            Self::NamePrefix => "RBAC_HARNESS_NAME_PREFIX",
        }
    }
}

// ============================================================================
// SECTION: Lookup
// ============================================================================

/// Source of raw environment values.
pub trait EnvLookup {
    /// Returns the raw value of `name`, if set.
    fn raw(&self, name: &str) -> Option<OsString>;
}

/// The current process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn raw(&self, name: &str) -> Option<OsString> {
        std::env::var_os(name)
    }
}

impl EnvLookup for BTreeMap<&str, &str> {
    fn raw(&self, name: &str) -> Option<OsString> {
        self.get(name).map(OsString::from)
    }
}

/// Reads `name` as trimmed UTF-8 text.
///
/// Unset variables yield `Ok(None)`.
///
/// # Errors
///
/// Returns an error naming the variable when it is not UTF-8 or is blank.
pub fn read_var(env: &impl EnvLookup, name: &str) -> Result<Option<String>, String> {
    let Some(raw) = env.raw(name) else {
        return Ok(None);
    };
    let text = raw.into_string().map_err(|_| format!("{name} must be valid UTF-8"))?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(format!("{name} must not be empty"));
    }
    Ok(Some(trimmed.to_string()))
}

/// Reads `name` and converts it with `parse`.
///
/// Conversion errors are prefixed with the variable name.
///
/// # Errors
///
/// Returns an error when [`read_var`] fails or `parse` rejects the value.
pub fn parse_var<T>(
    env: &impl EnvLookup,
    name: &str,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> Result<Option<T>, String> {
    read_var(env, name)?
        .map(|value| parse(&value).map_err(|err| format!("{name}: {err}")))
        .transpose()
}

/// Converts a whole number of seconds, rejecting zero.
///
/// # Errors
///
/// Returns an error for non-numeric or zero input.
pub fn seconds(value: &str) -> Result<Duration, String> {
    match value.parse::<u64>() {
        Ok(0) => Err("must be greater than zero".to_string()),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(format!("expected whole seconds, got {value:?}")),
    }
}

// ============================================================================
// SECTION: Overrides
// ============================================================================

/// Typed overrides derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvOverrides {
    /// Minimum timeout for every operation class.
    pub timeout: Option<Duration>,
    /// Generated-name prefix override.
    pub name_prefix: Option<String>,
}

impl EnvOverrides {
    /// Reads overrides from the process environment.
    ///
    /// # Errors
    ///
    /// See [`EnvOverrides::from_env`].
    pub fn load() -> Result<Self, String> {
        Self::from_env(&ProcessEnv)
    }

    /// Reads overrides from `env`.
    ///
    /// # Errors
    ///
    /// Returns an error when a set variable is malformed, when the timeout
    /// exceeds the largest poll timeout, or when the prefix is not a valid
    /// name prefix.
    pub fn from_env(env: &impl EnvLookup) -> Result<Self, String> {
        let timeout = parse_var(env, HarnessEnv::TimeoutSeconds.as_str(), |value| {
            let timeout = seconds(value)?;
            let limit = Duration::from_millis(MAX_POLL_TIMEOUT_MS);
            if timeout > limit {
                return Err(format!("must be at most {} seconds", limit.as_secs()));
            }
            Ok(timeout)
        })?;
        let name_prefix = parse_var(env, HarnessEnv::NamePrefix.as_str(), |value| {
            validate_name_prefix(value).map(|()| value.to_string()).map_err(|err| err.to_string())
        })?;
        Ok(Self {
            timeout,
            name_prefix,
        })
    }
}
