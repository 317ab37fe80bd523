// system-tests/src/config/env_tests.rs
// ============================================================================
// Module: System Test Env Unit Tests
// Description: Unit coverage for scenario-suite settings.
// Purpose: Pin accepted values for the system-test variables.
// Dependencies: system-tests config
// ============================================================================

//! ## Overview
//! Settings are read from in-memory tables keyed by [`SystemTestEnv`].

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::SystemTestConfig;
use super::SystemTestEnv;

/// Loads settings with the given variables set.
fn load(pairs: &[(SystemTestEnv, &str)]) -> Result<SystemTestConfig, String> {
    let env: BTreeMap<&str, &str> =
        pairs.iter().map(|(var, value)| (var.as_str(), *value)).collect();
    SystemTestConfig::from_env(&env)
}

/// Checks that defaults apply when nothing is set.
#[test]
fn defaults_apply_when_nothing_is_set() {
    assert_eq!(load(&[]).unwrap(), SystemTestConfig::default());
}

/// Checks that every variable is read.
#[test]
fn every_variable_is_read() {
    let config = load(&[
        (SystemTestEnv::RunRoot, "/tmp/rbac-runs"),
        (SystemTestEnv::TimeoutSeconds, "45"),
        (SystemTestEnv::SettleReads, "2"),
        (SystemTestEnv::WriteArtifacts, "TRUE"),
    ])
    .unwrap();
    assert_eq!(config.run_root, Some(PathBuf::from("/tmp/rbac-runs")));
    assert_eq!(config.timeout, Some(Duration::from_secs(45)));
    assert_eq!(config.settle_reads, Some(2));
    assert!(config.write_artifacts);
}

/// Checks that settle reads accept zero and the cap.
#[test]
fn settle_reads_accept_zero_and_the_cap() {
    assert_eq!(load(&[(SystemTestEnv::SettleReads, "0")]).unwrap().settle_reads, Some(0));
    assert_eq!(load(&[(SystemTestEnv::SettleReads, "64")]).unwrap().settle_reads, Some(64));
    assert!(load(&[(SystemTestEnv::SettleReads, "65")]).is_err());
    assert!(load(&[(SystemTestEnv::SettleReads, "-1")]).is_err());
}

/// Checks that a zero timeout is rejected.
#[test]
fn zero_timeout_is_rejected() {
    let error = load(&[(SystemTestEnv::TimeoutSeconds, "0")]).unwrap_err();
    assert!(error.starts_with(SystemTestEnv::TimeoutSeconds.as_str()), "{error}");
}

/// Checks that the artifact switch accepts only known literals.
#[test]
fn artifact_switch_accepts_only_known_literals() {
    assert!(!load(&[(SystemTestEnv::WriteArtifacts, "0")]).unwrap().write_artifacts);
    assert!(load(&[(SystemTestEnv::WriteArtifacts, "1")]).unwrap().write_artifacts);
    assert!(load(&[(SystemTestEnv::WriteArtifacts, "yes")]).is_err());
}

/// Checks that any blank variable stops the run.
#[test]
fn any_blank_variable_stops_the_run() {
    for var in SystemTestEnv::ALL {
        let error = load(&[(var, "")]).unwrap_err();
        assert!(error.contains(var.as_str()), "{error}");
    }
}
