// crates/role-aggregation/src/core/error.rs
// ============================================================================
// Module: Model Errors
// Description: Invariant violations raised by the aggregation model.
// Purpose: Give callers a single fatal error type for broken model assumptions.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every [`ModelError`] means an assumption of the model does not hold for the
//! supplied templates or grants. None of them are recoverable; callers surface
//! them to the scenario as fatal failures.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::identifiers::RoleTemplateId;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal model invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The inheritance graph loops back onto a template still being walked.
    #[error("inheritance cycle detected: {}", render_path(.path))]
    Cycle {
        /// Templates on the cycle, starting and ending with the repeated node.
        path: Vec<RoleTemplateId>,
    },
    /// A template id is referenced but not present in the arena.
    #[error("unknown role template {id}{}", render_referrer(.referenced_by.as_ref()))]
    UnknownTemplate {
        /// Missing template id.
        id: RoleTemplateId,
        /// Template that referenced the missing id, when known.
        referenced_by: Option<RoleTemplateId>,
    },
    /// A template with the same id is already registered.
    #[error("role template {0} already exists")]
    DuplicateTemplate(RoleTemplateId),
    /// A permission grant is structurally invalid.
    #[error("malformed grant: {0}")]
    MalformedGrant(String),
    /// A template cannot be removed while another template inherits it.
    #[error("role template {id} is still inherited by {dependent}")]
    StillInherited {
        /// Template being removed.
        id: RoleTemplateId,
        /// Template that still inherits it.
        dependent: RoleTemplateId,
    },
    /// Inheritance is deeper than the traversal limit.
    #[error("inheritance depth exceeds {max_depth} at {id}")]
    TooDeep {
        /// Maximum supported depth.
        max_depth: usize,
        /// Template where the limit was hit.
        id: RoleTemplateId,
    },
}

/// Convenient result alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders a cycle path as `a -> b -> a`.
fn render_path(path: &[RoleTemplateId]) -> String {
    path.iter().map(RoleTemplateId::as_str).collect::<Vec<_>>().join(" -> ")
}

/// Renders the optional referrer suffix of an unknown-template error.
fn render_referrer(referrer: Option<&RoleTemplateId>) -> String {
    referrer.map_or_else(String::new, |id| format!(" (inherited by {id})"))
}
