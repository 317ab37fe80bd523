// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for RBAC harness system tests.
// Purpose: Provide the scenario harness, fixtures, and summary artifacts.
// Dependencies: system-tests, rbac-harness-verifier, role-aggregation
// ============================================================================

//! ## Overview
//! Shared helpers for RBAC harness system tests.
//! Invariants:
//! - Every scenario runs against a fresh reference platform.
//! - Template, binding, and principal names are generated per run.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod artifacts;
pub mod fixtures;
pub mod harness;
