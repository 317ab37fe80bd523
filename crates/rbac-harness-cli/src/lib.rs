// crates/rbac-harness-cli/src/lib.rs
// ============================================================================
// Module: RBAC Harness CLI Library
// Description: Shared helpers for the rbac-harness command-line interface.
// Purpose: Provide the message catalog and fixture loading to the binary and tests.
// Dependencies: role-aggregation, serde, toml
// ============================================================================

//! ## Overview
//! The binary entry point (`src/main.rs`) imports these helpers so that all
//! user-facing output goes through one catalog and all fixture reads share
//! the same limits.
//!
//! Security posture: CLI inputs are untrusted and must be validated.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod fixture;
/// Message catalog and the `t!` macro.
pub mod i18n;
