// crates/rbac-harness-verifier/src/error.rs
// ============================================================================
// Module: Verifier Errors
// Description: Failure taxonomy for verification scenarios.
// Purpose: Keep model, convergence, mismatch, and platform failures distinct.
// Dependencies: role-aggregation, rbac-harness-config, thiserror
// ============================================================================

//! ## Overview
//! Every variant is fatal to the scenario that raised it. Authorization
//! denial is deliberately absent: a denied probe is a
//! [`crate::ProbeOutcome::Denied`] value, not an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use rbac_harness_config::OperationClass;
use role_aggregation::ModelError;
use thiserror::Error;

use crate::compare::VerificationMismatch;
use crate::platform::PlatformError;
use crate::scenario::ScenarioPhase;

// ============================================================================
// SECTION: Verifier Error
// ============================================================================

/// Fatal verifier failure.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// The model rejected the templates (cycle, dangling reference, bad grant).
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    /// The platform did not reach the expected state within budget.
    #[error(
        "convergence timeout for {class} after {elapsed_ms} ms and {attempts} attempts; last \
         observation: {last_observation}"
    )]
    ConvergenceTimeout {
        /// Operation class whose budget was exhausted.
        class: OperationClass,
        /// Time spent polling in milliseconds.
        elapsed_ms: u128,
        /// Number of reads performed.
        attempts: u32,
        /// Description of the last non-converged observation.
        last_observation: String,
    },
    /// Expected and actual state differ.
    #[error("{0}")]
    Mismatch(Box<VerificationMismatch>),
    /// The platform failed for a reason other than authorization denial.
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
    /// An operation was attempted in the wrong scenario phase.
    #[error("{operation} is not allowed in phase {phase}")]
    Phase {
        /// Operation attempted.
        operation: &'static str,
        /// Phase the scenario was in.
        phase: ScenarioPhase,
    },
    /// Teardown failed after an otherwise successful scenario.
    #[error("teardown failed for {count} resource(s)")]
    Teardown {
        /// Number of resources that could not be removed.
        count: usize,
    },
}

impl From<VerificationMismatch> for VerifierError {
    fn from(mismatch: VerificationMismatch) -> Self {
        Self::Mismatch(Box::new(mismatch))
    }
}

// ============================================================================
// SECTION: Teardown Failures
// ============================================================================

/// Resource that teardown could not remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownFailure {
    /// Resource kind and name.
    pub resource: String,
    /// Platform error returned by the delete call.
    pub error: PlatformError,
}

impl fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.resource, self.error)
    }
}

/// Failed scenario together with any teardown failures.
///
/// The original error is kept even when teardown also fails.
#[derive(Debug, Error)]
#[error("scenario {scenario} failed: {error}")]
pub struct ScenarioFailure {
    /// Scenario name.
    pub scenario: String,
    /// First fatal error.
    pub error: VerifierError,
    /// Resources left behind by teardown.
    pub teardown_failures: Vec<TeardownFailure>,
}
