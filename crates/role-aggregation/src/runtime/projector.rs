// crates/role-aggregation/src/runtime/projector.rs
// ============================================================================
// Module: Aggregated-Role Projector
// Description: Expected aggregated roles per template and cluster placement.
// Purpose: Turn aggregated rule sets into the roles the platform should hold.
// Dependencies: crate::{core, runtime::aggregator, runtime::classifier}
// ============================================================================

//! ## Overview
//! A projection holds one main aggregated role and up to two management
//! aggregates for a template, in one placement:
//! - local (management cluster): main carries the full transitive rule union,
//!   and each management aggregate carries the matching classified subset when
//!   that subset is non-empty;
//! - downstream: main carries only the regular subset and there are no
//!   management aggregates, since management-plane access is enforced
//!   centrally.
//!
//! An empty template projects to an empty main role, never to no role.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::catalog::ManagementResourceCatalog;
use crate::core::error::ModelResult;
use crate::core::grant::RuleSet;
use crate::core::identifiers::RoleTemplateId;
use crate::core::template::RoleScope;
use crate::core::template::TemplateArena;
use crate::runtime::aggregator::Aggregator;
use crate::runtime::classifier::partition;

// ============================================================================
// SECTION: Aggregated Roles
// ============================================================================

/// Cluster placement of a projected role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Management (local) cluster.
    Local,
    /// Any downstream workload cluster.
    Downstream,
}

impl Placement {
    /// Returns a stable label for the placement.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Downstream => "downstream",
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of aggregated role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    /// Full aggregated rule set.
    Main,
    /// Cluster management-plane subset.
    ClusterMgmt,
    /// Project management-plane subset.
    ProjectMgmt,
}

impl AggregateKind {
    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::ClusterMgmt => "cluster_mgmt",
            Self::ProjectMgmt => "project_mgmt",
        }
    }

    /// Returns the management kind for a scope.
    #[must_use]
    pub const fn management_for(scope: RoleScope) -> Self {
        match scope {
            RoleScope::Cluster => Self::ClusterMgmt,
            RoleScope::Project => Self::ProjectMgmt,
        }
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived, read-only aggregated role expectation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedRole {
    /// Template the role is derived from.
    pub owner: RoleTemplateId,
    /// Cluster placement.
    pub placement: Placement,
    /// Aggregate kind.
    pub kind: AggregateKind,
    /// Canonical rules.
    pub rules: RuleSet,
}

// ============================================================================
// SECTION: Projection
// ============================================================================

/// Expected aggregated roles of one template in one placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    /// Main aggregated role.
    pub main: AggregatedRole,
    /// Cluster management aggregate, present only when non-empty.
    pub cluster_mgmt: Option<AggregatedRole>,
    /// Project management aggregate, present only when non-empty.
    pub project_mgmt: Option<AggregatedRole>,
}

impl Projection {
    /// Iterates every projected role.
    pub fn roles(&self) -> impl Iterator<Item = &AggregatedRole> {
        std::iter::once(&self.main).chain(self.cluster_mgmt.iter()).chain(self.project_mgmt.iter())
    }

    /// Returns the management aggregate for a scope, if projected.
    #[must_use]
    pub const fn management(&self, scope: RoleScope) -> Option<&AggregatedRole> {
        match scope {
            RoleScope::Cluster => self.cluster_mgmt.as_ref(),
            RoleScope::Project => self.project_mgmt.as_ref(),
        }
    }
}

/// Which management aggregates a template's transitive rules touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ManagementKinds {
    /// Cluster management aggregate is non-empty.
    pub cluster: bool,
    /// Project management aggregate is non-empty.
    pub project: bool,
}

impl ManagementKinds {
    /// Returns how many management aggregates are non-empty.
    #[must_use]
    pub fn count(self) -> usize {
        usize::from(self.cluster) + usize::from(self.project)
    }

    /// Returns whether the aggregate for `scope` is non-empty.
    #[must_use]
    pub const fn touches(self, scope: RoleScope) -> bool {
        match scope {
            RoleScope::Cluster => self.cluster,
            RoleScope::Project => self.project,
        }
    }
}

// ============================================================================
// SECTION: Projector
// ============================================================================

/// Projects templates of an arena into expected aggregated roles.
#[derive(Debug)]
pub struct Projector<'a> {
    /// Memoizing aggregator.
    aggregator: Aggregator<'a>,
    /// Management resource catalog.
    catalog: &'a ManagementResourceCatalog,
}

impl<'a> Projector<'a> {
    /// Creates a projector over an arena and catalog.
    #[must_use]
    pub const fn new(arena: &'a TemplateArena, catalog: &'a ManagementResourceCatalog) -> Self {
        Self {
            aggregator: Aggregator::new(arena),
            catalog,
        }
    }

    /// Returns the arena being projected.
    #[must_use]
    pub const fn arena(&self) -> &'a TemplateArena {
        self.aggregator.arena()
    }

    /// Returns the catalog used for classification.
    #[must_use]
    pub const fn catalog(&self) -> &'a ManagementResourceCatalog {
        self.catalog
    }

    /// Returns the main aggregated rule set of a template.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ModelError`] when aggregation fails.
    pub fn aggregate(&mut self, id: &RoleTemplateId) -> ModelResult<RuleSet> {
        self.aggregator.aggregate(id)
    }

    /// Projects a template into one placement.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ModelError`] when aggregation fails.
    pub fn project(
        &mut self,
        id: &RoleTemplateId,
        placement: Placement,
    ) -> ModelResult<Projection> {
        let main = self.aggregator.aggregate(id)?;
        let split = partition(self.catalog, &main);
        let role = |kind, rules| AggregatedRole {
            owner: id.clone(),
            placement,
            kind,
            rules,
        };
        let projection = match placement {
            Placement::Local => Projection {
                cluster_mgmt: non_empty(split.cluster_mgmt)
                    .map(|rules| role(AggregateKind::ClusterMgmt, rules)),
                project_mgmt: non_empty(split.project_mgmt)
                    .map(|rules| role(AggregateKind::ProjectMgmt, rules)),
                main: role(AggregateKind::Main, main),
            },
            Placement::Downstream => Projection {
                main: role(AggregateKind::Main, split.regular),
                cluster_mgmt: None,
                project_mgmt: None,
            },
        };
        Ok(projection)
    }

    /// Returns which management aggregates the template's rules touch.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ModelError`] when aggregation fails.
    pub fn management_kinds(&mut self, id: &RoleTemplateId) -> ModelResult<ManagementKinds> {
        let local = self.project(id, Placement::Local)?;
        Ok(ManagementKinds {
            cluster: local.cluster_mgmt.is_some(),
            project: local.project_mgmt.is_some(),
        })
    }
}

/// Returns the rule set when it has at least one grant.
fn non_empty(rules: RuleSet) -> Option<RuleSet> {
    if rules.is_empty() { None } else { Some(rules) }
}

/// Projects one template into one placement without reusing a memo.
///
/// # Errors
///
/// Returns [`crate::ModelError`] when aggregation fails.
pub fn project(
    arena: &TemplateArena,
    catalog: &ManagementResourceCatalog,
    id: &RoleTemplateId,
    placement: Placement,
) -> ModelResult<Projection> {
    Projector::new(arena, catalog).project(id, placement)
}
