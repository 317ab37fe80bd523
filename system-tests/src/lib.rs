// system-tests/src/lib.rs
// ============================================================================
// Module: RBAC Harness System Tests Library
// Description: Shared configuration for end-to-end verification scenarios.
// Purpose: Provide environment-driven settings to the system-test binaries.
// Dependencies: rbac-harness-config
// ============================================================================

//! ## Overview
//! This crate hosts the configuration shared by the scenario suites in
//! `system-tests/tests`. Suites run full Setup, AwaitConvergence, Assert, and
//! Teardown cycles against the in-memory reference platform.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
