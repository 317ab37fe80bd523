// crates/rbac-harness-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for rbac-harness-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use rbac_harness_config::ConfigError;
use rbac_harness_config::HarnessConfig;

/// Parses a TOML string into a `HarnessConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<HarnessConfig, ConfigError> {
    HarnessConfig::from_toml_str(toml_str)
}

/// Parses and validates a TOML string.
pub fn validated(toml_str: &str) -> Result<HarnessConfig, ConfigError> {
    let config = config_from_toml(toml_str)?;
    config.validate()?;
    Ok(config)
}

/// Asserts that validation fails with an invalid-config error mentioning `needle`.
pub fn assert_invalid(toml_str: &str, needle: &str) -> Result<(), String> {
    match validated(toml_str) {
        Err(ConfigError::Invalid(message)) if message.contains(needle) => Ok(()),
        Err(other) => Err(format!("unexpected error: {other}")),
        Ok(_) => Err(format!("expected invalid config mentioning '{needle}'")),
    }
}
