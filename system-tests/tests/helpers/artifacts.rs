// system-tests/tests/helpers/artifacts.rs
// ============================================================================
// Module: Scenario Reports
// Description: Optional per-scenario summary files.
// Purpose: Leave a canonical JSON record of how each scenario ended.
// Dependencies: system-tests, serde, serde_jcs
// ============================================================================

//! ## Overview
//! A [`RunSummary`] is opened at the start of a scenario. When
//! `RBAC_HARNESS_SYSTEM_TEST_WRITE_ARTIFACTS` is on it writes
//! `<run root>/<scenario>/summary.json` once: on [`RunSummary::passed`],
//! or from `Drop` when the scenario failed or panicked first.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use system_tests::config::SystemTestConfig;

/// Run root used when none is configured.
const DEFAULT_RUN_ROOT: &str = "target/system-tests";

/// How a scenario ended.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
enum Outcome {
    /// Reached [`RunSummary::passed`].
    Passed,
    /// Unwound through a panic.
    Panicked,
    /// Returned early, usually through `?`.
    Abandoned,
}

/// Serialized summary.
#[derive(Debug, Serialize)]
struct Summary<'a> {
    /// Scenario label.
    scenario: &'a str,
    /// Final outcome.
    outcome: Outcome,
    /// Wall-clock time since the report was opened.
    elapsed_ms: u64,
    /// Audit events the harness recorded.
    audit_events: usize,
    /// Free-form notes.
    notes: &'a [String],
}

/// Summary writer for one scenario.
pub struct RunSummary {
    /// Scenario label.
    scenario: String,
    /// Output directory, present only when artifacts are enabled.
    dir: Option<PathBuf>,
    /// Start time.
    started: Instant,
    /// Notes recorded so far.
    notes: Vec<String>,
    /// Set once the summary has been written.
    written: bool,
}

impl RunSummary {
    /// Opens a report, creating its directory when artifacts are enabled.
    pub fn start(scenario: &str) -> io::Result<Self> {
        let config = SystemTestConfig::load().map_err(io::Error::other)?;
        let dir = if config.write_artifacts {
            let dir = config.run_root.unwrap_or_else(|| PathBuf::from(DEFAULT_RUN_ROOT));
            let dir = dir.join(scenario);
            fs::create_dir_all(&dir)?;
            Some(dir)
        } else {
            None
        };
        Ok(Self {
            scenario: scenario.to_string(),
            dir,
            started: Instant::now(),
            notes: Vec::new(),
            written: false,
        })
    }

    /// Adds a note to the summary.
    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Records a passing outcome.
    pub fn passed(mut self, audit_events: usize) -> io::Result<()> {
        self.write(Outcome::Passed, audit_events)
    }

    /// Writes the summary at most once.
    fn write(&mut self, outcome: Outcome, audit_events: usize) -> io::Result<()> {
        if std::mem::replace(&mut self.written, true) {
            return Ok(());
        }
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let summary = Summary {
            scenario: &self.scenario,
            outcome,
            elapsed_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
            audit_events,
            notes: &self.notes,
        };
        let bytes = serde_jcs::to_vec(&summary).map_err(io::Error::other)?;
        fs::write(dir.join("summary.json"), bytes)
    }
}

impl Drop for RunSummary {
    fn drop(&mut self) {
        let outcome =
            if std::thread::panicking() { Outcome::Panicked } else { Outcome::Abandoned };
        let _ = self.write(outcome, 0);
    }
}
