// crates/rbac-harness-verifier/src/lib.rs
// ============================================================================
// Module: RBAC Harness Verifier Library
// Description: Verification of materialized roles and grants against the model.
// Purpose: Drive setup, convergence, assertions, and teardown per scenario.
// Dependencies: role-aggregation, rbac-harness-config, rand, serde_json
// ============================================================================

//! ## Overview
//! The verifier compares what the platform materializes with what the
//! role-aggregation model predicts. A scenario moves through
//! `Setup -> AwaitConvergence -> Assert -> Teardown`; assertions never run
//! against state that has not converged, and teardown always runs.
//!
//! The platform is reached only through [`PlatformClient`]. The
//! [`MemoryPlatform`] implements it in process with delayed materialization
//! and its own label-selection aggregation, so full scenarios run offline.
//!
//! Security posture: platform responses are untrusted. Authorization denial
//! is a first-class probe outcome and is never conflated with other errors.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod compare;
pub mod convergence;
pub mod error;
pub mod memory;
pub mod names;
pub mod platform;
pub mod probe;
pub mod scenario;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditEvent;
pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::RecordingAuditSink;
pub use audit::StderrAuditSink;
pub use audit::build_audit_sink;
pub use compare::BindingDescriptor;
pub use compare::CheckKind;
pub use compare::GrantDescriptor;
pub use compare::MismatchDetails;
pub use compare::ObjectDescriptor;
pub use compare::VerificationMismatch;
pub use compare::Verifier;
pub use convergence::Observation;
pub use convergence::PollReport;
pub use convergence::Poller;
pub use error::ScenarioFailure;
pub use error::TeardownFailure;
pub use error::VerifierError;
pub use memory::MemoryPlatform;
pub use memory::MemoryPlatformOptions;
pub use names::NameGenerator;
pub use platform::GrantRecord;
pub use platform::ObjectSelector;
pub use platform::PlatformClient;
pub use platform::PlatformError;
pub use platform::ProbeRequest;
pub use platform::ProbeVerb;
pub use platform::RoleObjectRecord;
pub use probe::ProbeOutcome;
pub use probe::run_probe;
pub use scenario::LedgerEntry;
pub use scenario::Scenario;
pub use scenario::ScenarioPhase;
pub use scenario::ScenarioReport;
pub use scenario::ScenarioSettings;
pub use scenario::TeardownLedger;
pub use scenario::run_scenario;
