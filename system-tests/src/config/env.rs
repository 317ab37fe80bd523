// system-tests/src/config/env.rs
// ============================================================================
// Module: System Test Environment
// Description: Environment-backed settings for the scenario suites.
// Purpose: Map RBAC_HARNESS_SYSTEM_TEST_* variables onto typed settings.
// Dependencies: rbac-harness-config
// ============================================================================

//! ## Overview
//! Suites read their settings through the harness config crate's
//! [`EnvLookup`] helpers, so a malformed value stops the run instead of
//! falling back to a default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use rbac_harness_config::EnvLookup;
use rbac_harness_config::ProcessEnv;
use rbac_harness_config::parse_var;
use rbac_harness_config::seconds;

// ============================================================================
// SECTION: Variables
// ============================================================================

/// Environment keys read by the scenario suites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTestEnv {
    /// Directory that receives per-test summaries.
    RunRoot,
    /// Convergence timeout floor in whole seconds.
    TimeoutSeconds,
    /// Stale reads the reference platform serves after each change.
    SettleReads,
    /// Whether per-test summaries are written.
    WriteArtifacts,
}

impl SystemTestEnv {
    /// Every variable, in documentation order.
    pub const ALL: [Self; 4] =
        [Self::RunRoot, Self::TimeoutSeconds, Self::SettleReads, Self::WriteArtifacts];

    /// Variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RunRoot => "RBAC_HARNESS_SYSTEM_TEST_RUN_ROOT",
            Self::TimeoutSeconds => "RBAC_HARNESS_SYSTEM_TEST_TIMEOUT_SEC",
            Self::SettleReads => "RBAC_HARNESS_SYSTEM_TEST_SETTLE_READS",
            Self::WriteArtifacts => "RBAC_HARNESS_SYSTEM_TEST_WRITE_ARTIFACTS",
        }
    }
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Upper bound on stale reads per change.
pub const MAX_SETTLE_READS: u32 = 64;

/// Scenario-suite settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemTestConfig {
    /// Summary directory; the suites pick a temporary one when unset.
    pub run_root: Option<PathBuf>,
    /// Floor applied to every convergence timeout.
    pub timeout: Option<Duration>,
    /// Stale reads served by the reference platform.
    pub settle_reads: Option<u32>,
    /// Per-test summary switch, off unless set.
    pub write_artifacts: bool,
}

impl SystemTestConfig {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// See [`SystemTestConfig::from_env`].
    pub fn load() -> Result<Self, String> {
        Self::from_env(&ProcessEnv)
    }

    /// Reads settings from `env`.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable when a set value is blank,
    /// not UTF-8, or out of range.
    pub fn from_env(env: &impl EnvLookup) -> Result<Self, String> {
        Ok(Self {
            run_root: parse_var(env, SystemTestEnv::RunRoot.as_str(), |value| {
                Ok(PathBuf::from(value))
            })?,
            timeout: parse_var(env, SystemTestEnv::TimeoutSeconds.as_str(), seconds)?,
            settle_reads: parse_var(env, SystemTestEnv::SettleReads.as_str(), settle_reads)?,
            write_artifacts: parse_var(env, SystemTestEnv::WriteArtifacts.as_str(), switch)?
                .unwrap_or(false),
        })
    }
}

// ============================================================================
// SECTION: Parsers
// ============================================================================

/// Parses a stale-read count no larger than [`MAX_SETTLE_READS`].
fn settle_reads(value: &str) -> Result<u32, String> {
    let reads: u32 = value.parse().map_err(|_| format!("expected a count, got {value:?}"))?;
    if reads > MAX_SETTLE_READS {
        return Err(format!("at most {MAX_SETTLE_READS} reads are allowed"));
    }
    Ok(reads)
}

/// Parses `1`/`0` or a case-insensitive `true`/`false`.
fn switch(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(format!("expected 1, 0, true, or false, got {value:?}")),
    }
}
