// crates/rbac-harness-verifier/src/audit.rs
// ============================================================================
// Module: Verifier Audit Logging
// Description: Structured audit events for scenario runs.
// Purpose: Emit JSON-lines records for phases, polls, checks, probes, teardown.
// Dependencies: role-aggregation, rbac-harness-config, serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events are JSON lines with an `event` tag and a millisecond
//! timestamp. Verification events carry canonical hashes of the expected and
//! actual content; raw rule sets are attached only when the audit config opts
//! in with `include_rules`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use rbac_harness_config::AuditConfig;
use rbac_harness_config::AuditSinkKind;
use rbac_harness_config::OperationClass;
use role_aggregation::RuleDigest;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// Scenario phase transition.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioPhaseEvent {
    /// Event identifier.
    event: &'static str,
    /// Event timestamp (ms since epoch).
    timestamp_ms: u128,
    /// Scenario name.
    scenario: String,
    /// Phase left.
    from: &'static str,
    /// Phase entered.
    to: &'static str,
}

/// Inputs for scenario phase events.
pub struct ScenarioPhaseEventParams {
    /// Scenario name.
    pub scenario: String,
    /// Phase left.
    pub from: &'static str,
    /// Phase entered.
    pub to: &'static str,
}

impl ScenarioPhaseEvent {
    /// Builds a phase event.
    #[must_use]
    pub fn new(params: ScenarioPhaseEventParams) -> Self {
        Self {
            event: "scenario_phase",
            timestamp_ms: now_ms(),
            scenario: params.scenario,
            from: params.from,
            to: params.to,
        }
    }
}

/// Finished convergence poll.
#[derive(Debug, Clone, Serialize)]
pub struct ConvergencePollEvent {
    /// Event identifier.
    event: &'static str,
    /// Event timestamp (ms since epoch).
    timestamp_ms: u128,
    /// Operation class budget used.
    class: OperationClass,
    /// What was polled.
    subject: String,
    /// Reads performed.
    attempts: u32,
    /// Time spent polling.
    elapsed_ms: u128,
    /// `converged` or `timeout`.
    outcome: &'static str,
}

/// Inputs for convergence poll events.
pub struct ConvergencePollEventParams {
    /// Operation class budget used.
    pub class: OperationClass,
    /// What was polled.
    pub subject: String,
    /// Reads performed.
    pub attempts: u32,
    /// Time spent polling.
    pub elapsed_ms: u128,
    /// `converged` or `timeout`.
    pub outcome: &'static str,
}

impl ConvergencePollEvent {
    /// Builds a poll event.
    #[must_use]
    pub fn new(params: ConvergencePollEventParams) -> Self {
        Self {
            event: "convergence_poll",
            timestamp_ms: now_ms(),
            class: params.class,
            subject: params.subject,
            attempts: params.attempts,
            elapsed_ms: params.elapsed_ms,
            outcome: params.outcome,
        }
    }
}

/// Verification check result.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationEvent {
    /// Event identifier.
    event: &'static str,
    /// Event timestamp (ms since epoch).
    timestamp_ms: u128,
    /// Check kind label.
    check: &'static str,
    /// What was checked.
    subject: String,
    /// `ok` or `mismatch`.
    outcome: &'static str,
    /// Number of expected items.
    expected_count: usize,
    /// Number of actual items.
    actual_count: usize,
    /// Canonical hash of the expected content.
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_hash: Option<RuleDigest>,
    /// Canonical hash of the actual content.
    #[serde(skip_serializing_if = "Option::is_none")]
    actual_hash: Option<RuleDigest>,
    /// Raw expected content (explicit opt-in only).
    #[serde(skip_serializing_if = "Option::is_none")]
    expected: Option<Value>,
    /// Raw actual content (explicit opt-in only).
    #[serde(skip_serializing_if = "Option::is_none")]
    actual: Option<Value>,
}

/// Inputs for verification events.
pub struct VerificationEventParams {
    /// Check kind label.
    pub check: &'static str,
    /// What was checked.
    pub subject: String,
    /// `ok` or `mismatch`.
    pub outcome: &'static str,
    /// Number of expected items.
    pub expected_count: usize,
    /// Number of actual items.
    pub actual_count: usize,
    /// Canonical hash of the expected content.
    pub expected_hash: Option<RuleDigest>,
    /// Canonical hash of the actual content.
    pub actual_hash: Option<RuleDigest>,
    /// Raw expected content (explicit opt-in only).
    pub expected: Option<Value>,
    /// Raw actual content (explicit opt-in only).
    pub actual: Option<Value>,
}

impl VerificationEvent {
    /// Builds a verification event.
    #[must_use]
    pub fn new(params: VerificationEventParams) -> Self {
        Self {
            event: "verification",
            timestamp_ms: now_ms(),
            check: params.check,
            subject: params.subject,
            outcome: params.outcome,
            expected_count: params.expected_count,
            actual_count: params.actual_count,
            expected_hash: params.expected_hash,
            actual_hash: params.actual_hash,
            expected: params.expected,
            actual: params.actual,
        }
    }
}

/// Permission probe result.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeEvent {
    /// Event identifier.
    event: &'static str,
    /// Event timestamp (ms since epoch).
    timestamp_ms: u128,
    /// Impersonated principal.
    principal: String,
    /// Probed operation.
    request: String,
    /// Expected outcome label.
    expected: &'static str,
    /// Observed outcome label, or `error`.
    observed: &'static str,
}

/// Inputs for probe events.
pub struct ProbeEventParams {
    /// Impersonated principal.
    pub principal: String,
    /// Probed operation.
    pub request: String,
    /// Expected outcome label.
    pub expected: &'static str,
    /// Observed outcome label, or `error`.
    pub observed: &'static str,
}

impl ProbeEvent {
    /// Builds a probe event.
    #[must_use]
    pub fn new(params: ProbeEventParams) -> Self {
        Self {
            event: "probe",
            timestamp_ms: now_ms(),
            principal: params.principal,
            request: params.request,
            expected: params.expected,
            observed: params.observed,
        }
    }
}

/// Teardown step result.
#[derive(Debug, Clone, Serialize)]
pub struct TeardownEvent {
    /// Event identifier.
    event: &'static str,
    /// Event timestamp (ms since epoch).
    timestamp_ms: u128,
    /// Scenario name.
    scenario: String,
    /// Resource kind and name.
    resource: String,
    /// `deleted`, `already_gone`, or `failed`.
    outcome: &'static str,
    /// Error text for failed deletions.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Inputs for teardown events.
pub struct TeardownEventParams {
    /// Scenario name.
    pub scenario: String,
    /// Resource kind and name.
    pub resource: String,
    /// `deleted`, `already_gone`, or `failed`.
    pub outcome: &'static str,
    /// Error text for failed deletions.
    pub error: Option<String>,
}

impl TeardownEvent {
    /// Builds a teardown event.
    #[must_use]
    pub fn new(params: TeardownEventParams) -> Self {
        Self {
            event: "teardown",
            timestamp_ms: now_ms(),
            scenario: params.scenario,
            resource: params.resource,
            outcome: params.outcome,
            error: params.error,
        }
    }
}

/// Any audit event.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AuditEvent {
    /// Phase transition.
    ScenarioPhase(ScenarioPhaseEvent),
    /// Finished poll.
    ConvergencePoll(ConvergencePollEvent),
    /// Verification check.
    Verification(VerificationEvent),
    /// Permission probe.
    Probe(ProbeEvent),
    /// Teardown step.
    Teardown(TeardownEvent),
}

/// Returns the current time in milliseconds since the epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Audit Sinks
// ============================================================================

/// Audit sink for verifier events.
pub trait AuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &AuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

/// Audit sink that keeps events in memory as JSON values.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Recorded events in emission order.
    events: Mutex<Vec<Value>>,
}

impl RecordingAuditSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<Value> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the recorded events with the given `event` tag.
    #[must_use]
    pub fn events_named(&self, name: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|event| event.get("event").and_then(Value::as_str) == Some(name))
            .collect()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(value) = serde_json::to_value(event)
            && let Ok(mut events) = self.events.lock()
        {
            events.push(value);
        }
    }
}

/// Builds the sink selected by the audit config.
///
/// # Errors
///
/// Returns an error when the file sink cannot open its path.
pub fn build_audit_sink(config: &AuditConfig) -> io::Result<Arc<dyn AuditSink>> {
    match (config.sink, config.path.as_deref()) {
        (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
        (AuditSinkKind::File, Some(path)) => Ok(Arc::new(FileAuditSink::new(Path::new(path))?)),
        (AuditSinkKind::File, None) => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "audit.path is required for the file sink",
        )),
        (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
    }
}
