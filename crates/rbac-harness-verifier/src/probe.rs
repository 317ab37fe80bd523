// crates/rbac-harness-verifier/src/probe.rs
// ============================================================================
// Module: Permission Probes
// Description: Impersonated single operations with a two-valued outcome.
// Purpose: Separate authorization denial from every other probe failure.
// Dependencies: role-aggregation, serde, crate::{audit, compare, platform}
// ============================================================================

//! ## Overview
//! A probe is allowed when the platform returns no error and denied only when
//! it returns [`Forbidden`](crate::platform::PlatformError::Forbidden). Every
//! other error, `Unauthorized` included, is fatal to the scenario and is never
//! read as an expected denial.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use role_aggregation::Principal;
use serde::Deserialize;
use serde::Serialize;

use crate::audit::AuditEvent;
use crate::audit::AuditSink;
use crate::audit::ProbeEvent;
use crate::audit::ProbeEventParams;
use crate::compare::CheckKind;
use crate::compare::MismatchDetails;
use crate::compare::VerificationMismatch;
use crate::error::VerifierError;
use crate::platform::PlatformClient;
use crate::platform::ProbeRequest;

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Outcome of a permission probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// The operation succeeded.
    Allowed,
    /// The operation was denied by authorization.
    Denied,
}

impl ProbeOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Denied => "denied",
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Probes
// ============================================================================

/// Runs one probe and classifies the result.
///
/// # Errors
///
/// Returns [`VerifierError::Platform`] for any platform error other than
/// [`Forbidden`](crate::platform::PlatformError::Forbidden).
pub fn run_probe<P: PlatformClient + ?Sized>(
    platform: &P,
    principal: &Principal,
    request: &ProbeRequest,
) -> Result<ProbeOutcome, VerifierError> {
    match platform.probe(principal, request) {
        Ok(()) => Ok(ProbeOutcome::Allowed),
        Err(err) if err.is_forbidden() => Ok(ProbeOutcome::Denied),
        Err(err) => Err(VerifierError::Platform(err)),
    }
}

/// Runs a probe and checks it against an expected outcome.
///
/// # Errors
///
/// Returns [`VerifierError::Mismatch`] when the observed outcome differs and
/// [`VerifierError::Platform`] when the probe itself failed.
pub fn expect_probe<P: PlatformClient + ?Sized>(
    platform: &P,
    audit: &dyn AuditSink,
    principal: &Principal,
    request: &ProbeRequest,
    expected: ProbeOutcome,
) -> Result<(), VerifierError> {
    let observed = run_probe(platform, principal, request);
    audit.record(&AuditEvent::Probe(ProbeEvent::new(ProbeEventParams {
        principal: principal.to_string(),
        request: request.to_string(),
        expected: expected.as_str(),
        observed: observed.as_ref().map_or("error", |outcome| outcome.as_str()),
    })));
    let observed = observed?;
    if observed == expected {
        return Ok(());
    }
    Err(VerificationMismatch {
        check: CheckKind::Probe,
        subject: format!("{principal} {request}"),
        details: MismatchDetails::Probe {
            principal: principal.clone(),
            request: request.clone(),
            expected,
            observed,
        },
    }
    .into())
}
