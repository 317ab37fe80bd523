// system-tests/tests/helpers/harness.rs
// ============================================================================
// Module: Scenario Harness
// Description: Reference platform plus scenario settings for one test.
// Purpose: Run full scenarios with env-tunable convergence behavior.
// Dependencies: system-tests, rbac-harness-config, rbac-harness-verifier
// ============================================================================

//! ## Overview
//! [`SystemHarness`] pairs a fresh in-memory platform with a recording audit
//! sink. Suite settings come from `SystemTestConfig`: the timeout floor raises
//! every budget and the settle-read count delays convergence.

use std::sync::Arc;

use rbac_harness_config::ConvergenceConfig;
use rbac_harness_config::PollBudget;
use rbac_harness_verifier::AuditSink;
use rbac_harness_verifier::MemoryPlatform;
use rbac_harness_verifier::MemoryPlatformOptions;
use rbac_harness_verifier::RecordingAuditSink;
use rbac_harness_verifier::Scenario;
use rbac_harness_verifier::ScenarioFailure;
use rbac_harness_verifier::ScenarioReport;
use rbac_harness_verifier::ScenarioSettings;
use rbac_harness_verifier::VerifierError;
use rbac_harness_verifier::run_scenario;
use role_aggregation::MaterializationPolicy;
use system_tests::config::SystemTestConfig;

/// Downstream cluster every suite uses.
pub const DOWNSTREAM: &str = "c-1";

/// Budgets for the reference platform; the env timeout acts as a floor.
fn convergence(config: &SystemTestConfig) -> ConvergenceConfig {
    let mut budgets = ConvergenceConfig {
        read: PollBudget::new(5, 2_000),
        binding_create: PollBudget::new(5, 4_000),
        deletion: PollBudget::new(5, 4_000),
    };
    if let Some(floor) = config.timeout {
        budgets.raise_timeouts(floor);
    }
    budgets
}

/// Reference platform, settings, and recorded audit for one test.
pub struct SystemHarness {
    platform: MemoryPlatform,
    settings: ScenarioSettings,
    audit: Arc<RecordingAuditSink>,
}

impl SystemHarness {
    /// Builds a harness with the default policy.
    pub fn new() -> Result<Self, String> {
        Self::with_policy(MaterializationPolicy::default())
    }

    /// Builds a harness whose platform and model share `policy`.
    pub fn with_policy(policy: MaterializationPolicy) -> Result<Self, String> {
        let config = SystemTestConfig::load()?;
        let mut options = MemoryPlatformOptions::new([DOWNSTREAM]).with_policy(policy);
        if let Some(reads) = config.settle_reads {
            options = options.with_settle_reads(reads);
        }
        let settings = ScenarioSettings::default()
            .with_convergence(convergence(&config))
            .with_policy(policy);
        Ok(Self {
            platform: MemoryPlatform::new(options),
            settings,
            audit: Arc::new(RecordingAuditSink::new()),
        })
    }

    /// Returns the reference platform.
    pub const fn platform(&self) -> &MemoryPlatform {
        &self.platform
    }

    /// Returns the recorded audit events.
    pub fn audit(&self) -> &RecordingAuditSink {
        &self.audit
    }

    /// Runs one scenario body with teardown.
    pub fn run<F>(&self, name: &str, body: F) -> Result<ScenarioReport, ScenarioFailure>
    where
        F: FnOnce(&mut Scenario<'_, MemoryPlatform>) -> Result<(), VerifierError>,
    {
        let audit: Arc<dyn AuditSink> = self.audit.clone();
        run_scenario(name, &self.platform, self.settings.clone(), audit, body)
    }
}
