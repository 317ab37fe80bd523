// system-tests/src/config/mod.rs
// ============================================================================
// Module: System Test Configuration
// Description: Centralized configuration for RBAC harness system tests.
// Purpose: Provide typed access to test environment settings and defaults.
// Dependencies: rbac-harness-config
// ============================================================================

//! ## Overview
//! System-test configuration is read from environment variables and mapped
//! into a small typed structure: the summary root, a convergence timeout
//! floor, and how many stale reads the reference platform serves.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod env;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod env_tests;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use env::MAX_SETTLE_READS;
pub use env::SystemTestConfig;
pub use env::SystemTestEnv;
