// crates/rbac-harness-verifier/src/names.rs
// ============================================================================
// Module: Unique Names
// Description: Collision-resistant names for scenario resources.
// Purpose: Isolate concurrent scenarios by naming rather than locking.
// Dependencies: rand
// ============================================================================

//! ## Overview
//! Names combine a configured prefix, a caller stem, a random run id, and a
//! per-generator counter. They stay lowercase alphanumeric with dashes so the
//! platform accepts them as object names.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use rand::RngCore;
use rand::rngs::OsRng;

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Run-scoped name generator.
///
/// # Invariants
/// - Names issued by one generator never repeat.
#[derive(Debug)]
pub struct NameGenerator {
    /// Prefix placed in front of every name.
    prefix: String,
    /// Random identifier for this generator.
    run_id: u32,
    /// Monotonic counter for issued names.
    counter: AtomicU64,
}

impl NameGenerator {
    /// Creates a generator with the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            run_id: OsRng.next_u32(),
            counter: AtomicU64::new(1),
        }
    }

    /// Returns the configured prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Issues a new name derived from `stem`.
    #[must_use]
    pub fn issue(&self, stem: &str) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{stem}-{:08x}-{seq}", self.prefix, self.run_id)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
