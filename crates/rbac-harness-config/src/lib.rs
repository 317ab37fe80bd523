// crates/rbac-harness-config/src/lib.rs
// ============================================================================
// Module: RBAC Harness Config Library
// Description: Canonical configuration model and validation for the harness.
// Purpose: Single source of truth for rbac-harness.toml semantics.
// Dependencies: role-aggregation, serde, toml
// ============================================================================

//! ## Overview
//! `rbac-harness-config` defines the configuration the verifier runs with:
//! polling budgets per operation class, the management resource catalog,
//! materialization policies, scenario naming, and audit output. Validation is
//! strict and fails closed.
//!
//! Security posture: config files and environment values are untrusted input.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;

// ============================================================================
// SECTION: Tests
// ============================================================================


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use env::EnvOverrides;
pub use env::HarnessEnv;
pub use env::EnvLookup;
pub use env::ProcessEnv;
pub use env::parse_var;
pub use env::read_var;
pub use env::seconds;
