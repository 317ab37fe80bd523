// crates/role-aggregation/src/runtime/inventory.rs
// ============================================================================
// Module: Role Object Inventory
// Description: Named role objects the platform materializes per template.
// Purpose: Predict per-cluster role object names, counts, and rule content.
// Dependencies: crate::{core, runtime::classifier, runtime::projector}
// ============================================================================

//! ## Overview
//! The platform materializes every role template as a small family of named
//! role objects:
//! - in every cluster, `<T>` carrying the template's own rules and
//!   `<T>-aggregator` carrying the main aggregated rules (downstream, both
//!   restricted to regular grants);
//! - in the management cluster only, `<T>-cluster-mgmt` and
//!   `<T>-cluster-mgmt-aggregator` when the template's own rules contain a
//!   cluster management grant, and the `project-mgmt` pair likewise.
//!
//! Management aggregators select their members by label across the
//! inheritance closure, so a template that only inherits management rules
//! has no management objects of its own while its bindings still resolve
//! through the aggregator name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::ModelResult;
use crate::core::grant::RuleSet;
use crate::core::identifiers::ClusterId;
use crate::core::identifiers::ClusterRef;
use crate::core::identifiers::RoleTemplateId;
use crate::core::template::RoleScope;
use crate::runtime::classifier::management_subset;
use crate::runtime::classifier::regular_subset;
use crate::runtime::projector::AggregateKind;
use crate::runtime::projector::Placement;
use crate::runtime::projector::Projector;

// ============================================================================
// SECTION: Object Kinds
// ============================================================================

/// Kind of materialized role object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleObjectKind {
    /// Template's own rules.
    Own,
    /// Main aggregated rules.
    Aggregator,
    /// Own cluster management rules.
    ClusterMgmt,
    /// Aggregated cluster management rules.
    ClusterMgmtAggregator,
    /// Own project management rules.
    ProjectMgmt,
    /// Aggregated project management rules.
    ProjectMgmtAggregator,
}

impl RoleObjectKind {
    /// All kinds in materialization order.
    pub const ALL: [Self; 6] = [
        Self::Own,
        Self::Aggregator,
        Self::ClusterMgmt,
        Self::ClusterMgmtAggregator,
        Self::ProjectMgmt,
        Self::ProjectMgmtAggregator,
    ];

    /// Returns the name suffix appended to the template id.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Own => "",
            Self::Aggregator => "-aggregator",
            Self::ClusterMgmt => "-cluster-mgmt",
            Self::ClusterMgmtAggregator => "-cluster-mgmt-aggregator",
            Self::ProjectMgmt => "-project-mgmt",
            Self::ProjectMgmtAggregator => "-project-mgmt-aggregator",
        }
    }

    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Own => "own",
            Self::Aggregator => "aggregator",
            Self::ClusterMgmt => "cluster_mgmt",
            Self::ClusterMgmtAggregator => "cluster_mgmt_aggregator",
            Self::ProjectMgmt => "project_mgmt",
            Self::ProjectMgmtAggregator => "project_mgmt_aggregator",
        }
    }

    /// Returns true for label-selecting aggregator objects.
    #[must_use]
    pub const fn is_aggregator(self) -> bool {
        matches!(self, Self::Aggregator | Self::ClusterMgmtAggregator | Self::ProjectMgmtAggregator)
    }

    /// Returns the aggregate kind this object carries rules for.
    #[must_use]
    pub const fn aggregate_kind(self) -> AggregateKind {
        match self {
            Self::Own | Self::Aggregator => AggregateKind::Main,
            Self::ClusterMgmt | Self::ClusterMgmtAggregator => AggregateKind::ClusterMgmt,
            Self::ProjectMgmt | Self::ProjectMgmtAggregator => AggregateKind::ProjectMgmt,
        }
    }

    /// Returns the aggregator kind for a management scope.
    #[must_use]
    pub const fn management_aggregator(scope: RoleScope) -> Self {
        match scope {
            RoleScope::Cluster => Self::ClusterMgmtAggregator,
            RoleScope::Project => Self::ProjectMgmtAggregator,
        }
    }

    /// Returns the member kind for a management scope.
    #[must_use]
    pub const fn management_member(scope: RoleScope) -> Self {
        match scope {
            RoleScope::Cluster => Self::ClusterMgmt,
            RoleScope::Project => Self::ProjectMgmt,
        }
    }
}

impl fmt::Display for RoleObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the role object name for a template and kind.
#[must_use]
pub fn role_object_name(owner: &RoleTemplateId, kind: RoleObjectKind) -> String {
    format!("{owner}{}", kind.suffix())
}

// ============================================================================
// SECTION: Expected Objects
// ============================================================================

/// Expected materialized role object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExpectedRoleObject {
    /// Cluster holding the object.
    pub cluster: ClusterRef,
    /// Object name.
    pub name: String,
    /// Template the object is derived from.
    pub owner: RoleTemplateId,
    /// Object kind.
    pub kind: RoleObjectKind,
    /// Expected rules.
    pub rules: RuleSet,
}

// ============================================================================
// SECTION: Inventory
// ============================================================================

/// Computes the named role objects of templates.
#[derive(Debug)]
pub struct ObjectInventory<'a> {
    /// Projector supplying aggregated rules.
    projector: Projector<'a>,
}

impl<'a> ObjectInventory<'a> {
    /// Creates an inventory on top of a projector.
    #[must_use]
    pub const fn new(projector: Projector<'a>) -> Self {
        Self {
            projector,
        }
    }

    /// Returns the underlying projector.
    pub const fn projector(&mut self) -> &mut Projector<'a> {
        &mut self.projector
    }

    /// Returns the role objects of one template in one cluster.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ModelError`] when the template cannot be aggregated.
    pub fn objects_for(
        &mut self,
        id: &RoleTemplateId,
        cluster: &ClusterRef,
    ) -> ModelResult<Vec<ExpectedRoleObject>> {
        let catalog = self.projector.catalog();
        let own = self.projector.arena().require(id)?.own_rules();
        let placement = if cluster.is_local() { Placement::Local } else { Placement::Downstream };
        let projection = self.projector.project(id, placement)?;
        let object = |kind, rules| ExpectedRoleObject {
            cluster: cluster.clone(),
            name: role_object_name(id, kind),
            owner: id.clone(),
            kind,
            rules,
        };

        let mut out = Vec::with_capacity(RoleObjectKind::ALL.len());
        match placement {
            Placement::Downstream => {
                out.push(object(RoleObjectKind::Own, regular_subset(catalog, &own)));
                out.push(object(RoleObjectKind::Aggregator, projection.main.rules));
            }
            Placement::Local => {
                out.push(object(RoleObjectKind::Own, own.clone()));
                out.push(object(RoleObjectKind::Aggregator, projection.main.rules.clone()));
                for scope in [RoleScope::Cluster, RoleScope::Project] {
                    let own_subset = management_subset(catalog, &own, scope);
                    if own_subset.is_empty() {
                        continue;
                    }
                    let aggregated = management_subset(catalog, &projection.main.rules, scope);
                    out.push(object(RoleObjectKind::management_member(scope), own_subset));
                    out.push(object(RoleObjectKind::management_aggregator(scope), aggregated));
                }
            }
        }
        Ok(out)
    }

    /// Returns every object of one template across the management cluster
    /// and the given downstream clusters.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ModelError`] when the template cannot be aggregated.
    pub fn objects_everywhere(
        &mut self,
        id: &RoleTemplateId,
        downstream: &[ClusterId],
    ) -> ModelResult<Vec<ExpectedRoleObject>> {
        let mut out = self.objects_for(id, &ClusterRef::Local)?;
        for cluster in downstream {
            out.extend(self.objects_for(id, &ClusterRef::Downstream(cluster.clone()))?);
        }
        Ok(out)
    }

    /// Returns the objects of every template in the arena, sorted.
    ///
    /// # Errors
    ///
    /// Returns the first [`crate::ModelError`] met.
    pub fn all_objects(
        &mut self,
        downstream: &[ClusterId],
    ) -> ModelResult<Vec<ExpectedRoleObject>> {
        let arena = self.projector.arena();
        let mut out = Vec::new();
        for template in arena.iter() {
            out.extend(self.objects_everywhere(&template.id, downstream)?);
        }
        out.sort();
        Ok(out)
    }
}
