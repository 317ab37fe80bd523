// crates/role-aggregation/src/core/policy.rs
// ============================================================================
// Module: Materialization Policy
// Description: Policy points for platform behavior that is observed, not designed.
// Purpose: Keep today's platform behavior configurable instead of hard-coded.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Two platform behaviors are documented as current rather than intended:
//! deleting a role template leaves bindings that reference it in place, and
//! changing a template's inheritance does not recompute the management-cluster
//! grants of bindings that already exist. Both are expressed as policies so
//! expectations follow whichever behavior the platform under test exhibits.

use serde::Deserialize;
use serde::Serialize;

/// What happens to bindings when their role template is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateDeletionPolicy {
    /// Bindings and their grants stay in place (current platform behavior).
    #[default]
    RetainBindings,
    /// Bindings are removed together with the template.
    CascadeBindings,
}

/// Whether existing bindings follow later inheritance changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InheritanceChangePolicy {
    /// Management-cluster grants stay as materialized at binding creation.
    #[default]
    KeepLocalGrants,
    /// Management-cluster grants are recomputed from the current template graph.
    RecomputeLocalGrants,
}

/// Combined materialization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MaterializationPolicy {
    /// Template deletion behavior.
    #[serde(default)]
    pub template_deletion: TemplateDeletionPolicy,
    /// Inheritance change behavior.
    #[serde(default)]
    pub inheritance_change: InheritanceChangePolicy,
}
