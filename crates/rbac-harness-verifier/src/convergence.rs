// crates/rbac-harness-verifier/src/convergence.rs
// ============================================================================
// Module: Convergence Polling
// Description: Bounded fetch-and-check loops per operation class.
// Purpose: Wait for asynchronous materialization without unbounded retries.
// Dependencies: rbac-harness-config, crate::{audit, error}
// ============================================================================

//! ## Overview
//! The platform materializes derived objects asynchronously. [`Poller`]
//! repeats a read at the class interval until the check reports
//! [`Observation::Ready`] or the class timeout elapses. A timeout is fatal and
//! carries the last observation. Only the read is retried; errors returned by
//! the check propagate immediately.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use rbac_harness_config::ConvergenceConfig;
use rbac_harness_config::OperationClass;

use crate::audit::AuditEvent;
use crate::audit::AuditSink;
use crate::audit::ConvergencePollEvent;
use crate::audit::ConvergencePollEventParams;
use crate::error::VerifierError;

// ============================================================================
// SECTION: Observations
// ============================================================================

/// Result of one fetch-and-check pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation<T> {
    /// The platform reached the expected state.
    Ready(T),
    /// Not converged yet; the description explains what is missing.
    Pending(String),
}

/// Summary of a finished poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    /// Number of reads performed.
    pub attempts: u32,
    /// Time spent polling.
    pub elapsed: Duration,
}

// ============================================================================
// SECTION: Poller
// ============================================================================

/// Bounded poller configured per operation class.
#[derive(Clone)]
pub struct Poller {
    /// Budgets per operation class.
    budgets: ConvergenceConfig,
    /// Audit sink receiving one event per finished poll.
    audit: Arc<dyn AuditSink>,
}

impl Poller {
    /// Creates a poller.
    #[must_use]
    pub fn new(budgets: ConvergenceConfig, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            budgets,
            audit,
        }
    }

    /// Returns the configured budgets.
    #[must_use]
    pub const fn budgets(&self) -> &ConvergenceConfig {
        &self.budgets
    }

    /// Polls `check` until it is ready or the budget of `class` runs out.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::ConvergenceTimeout`] when the budget is
    /// exhausted, or the first error returned by `check`.
    pub fn poll<T, F>(
        &self,
        class: OperationClass,
        subject: &str,
        mut check: F,
    ) -> Result<(T, PollReport), VerifierError>
    where
        F: FnMut() -> Result<Observation<T>, VerifierError>,
    {
        let budget = self.budgets.budget(class);
        let started = Instant::now();
        let mut attempts = 0u32;
        loop {
            attempts = attempts.saturating_add(1);
            let last_observation = match check()? {
                Observation::Ready(value) => {
                    let report = PollReport {
                        attempts,
                        elapsed: started.elapsed(),
                    };
                    self.record(class, subject, report, "converged");
                    return Ok((value, report));
                }
                Observation::Pending(description) => description,
            };
            let elapsed = started.elapsed();
            if elapsed >= budget.timeout() {
                let report = PollReport {
                    attempts,
                    elapsed,
                };
                self.record(class, subject, report, "timeout");
                return Err(VerifierError::ConvergenceTimeout {
                    class,
                    elapsed_ms: elapsed.as_millis(),
                    attempts,
                    last_observation,
                });
            }
            let remaining = budget.timeout().saturating_sub(elapsed);
            thread::sleep(budget.interval().min(remaining));
        }
    }

    /// Emits a poll audit event.
    fn record(
        &self,
        class: OperationClass,
        subject: &str,
        report: PollReport,
        outcome: &'static str,
    ) {
        self.audit.record(&AuditEvent::ConvergencePoll(ConvergencePollEvent::new(
            ConvergencePollEventParams {
                class,
                subject: subject.to_string(),
                attempts: report.attempts,
                elapsed_ms: report.elapsed.as_millis(),
                outcome,
            },
        )));
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller").field("budgets", &self.budgets).finish_non_exhaustive()
    }
}
