// crates/rbac-harness-config/tests/config_defaults.rs
// ============================================================================
// Module: Config Default Tests
// Description: Defaults applied when sections are omitted.
// ============================================================================
//! ## Overview
//! Validates that an empty configuration is valid and uses the built-in
//! budgets, catalog, and policies.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::time::Duration;

use common::validated;
use rbac_harness_config::AuditSinkKind;
use rbac_harness_config::HarnessConfig;
use rbac_harness_config::OperationClass;
use role_aggregation::InheritanceChangePolicy;
use role_aggregation::ManagementResourceCatalog;
use role_aggregation::TemplateDeletionPolicy;

type TestResult = Result<(), String>;

#[test]
fn empty_config_is_valid_and_defaulted() -> TestResult {
    let config = validated("").map_err(|err| err.to_string())?;
    assert_eq!(config, HarnessConfig::default());
    Ok(())
}

#[test]
fn default_budgets_differ_per_operation_class() -> TestResult {
    let config = validated("").map_err(|err| err.to_string())?;
    let read = config.convergence.budget(OperationClass::Read);
    let create = config.convergence.budget(OperationClass::BindingCreate);
    let delete = config.convergence.budget(OperationClass::Deletion);
    assert_eq!(read.interval(), Duration::from_millis(250));
    assert_eq!(read.timeout(), Duration::from_secs(30));
    assert_eq!(create.timeout(), Duration::from_secs(120));
    assert_eq!(delete.interval(), Duration::from_secs(1));
    assert!(create.timeout() > read.timeout());
    Ok(())
}

#[test]
fn default_catalog_matches_builtin_catalog() -> TestResult {
    let config = validated("").map_err(|err| err.to_string())?;
    assert_eq!(config.catalog.to_catalog(), ManagementResourceCatalog::default());
    Ok(())
}

#[test]
fn default_policy_reflects_current_platform_behavior() -> TestResult {
    let config = validated("").map_err(|err| err.to_string())?;
    assert_eq!(config.policy.template_deletion, TemplateDeletionPolicy::RetainBindings);
    assert_eq!(config.policy.inheritance_change, InheritanceChangePolicy::KeepLocalGrants);
    assert_eq!(config.audit.sink, AuditSinkKind::None);
    assert!(!config.audit.include_rules);
    assert_eq!(config.scenario.name_prefix, "rbac");
    Ok(())
}

#[test]
fn partial_sections_keep_remaining_defaults() -> TestResult {
    let config = validated(
        r#"
[convergence.read]
interval_ms = 100
timeout_ms = 5000

[policy]
template_deletion = "cascade_bindings"
"#,
    )
    .map_err(|err| err.to_string())?;
    assert_eq!(config.convergence.read.interval_ms, 100);
    let defaults = HarnessConfig::default();
    assert_eq!(config.convergence.binding_create, defaults.convergence.binding_create);
    assert_eq!(config.policy.template_deletion, TemplateDeletionPolicy::CascadeBindings);
    assert_eq!(config.policy.inheritance_change, InheritanceChangePolicy::KeepLocalGrants);
    Ok(())
}
