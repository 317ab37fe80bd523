// crates/role-aggregation/src/lib.rs
// ============================================================================
// Module: Role Aggregation Library
// Description: Public API surface for the role-template aggregation model.
// Purpose: Expose grant types, the inheritance aggregator, and expectations.
// Dependencies: crate::{core, runtime}
// ============================================================================

//! ## Overview
//! Role aggregation models how a role-based permission system computes the
//! effective permissions of role templates that inherit from each other, how
//! those permissions are projected into aggregated role objects in the
//! management cluster and in downstream clusters, and how bindings fan out
//! into low-level grants. The crate is pure and synchronous; talking to a
//! platform is the verifier's job.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use crate::runtime::*;
