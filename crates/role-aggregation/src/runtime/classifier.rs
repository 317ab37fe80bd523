// crates/role-aggregation/src/runtime/classifier.rs
// ============================================================================
// Module: Resource Classifier
// Description: Pure classification of grants into regular or management-plane.
// Purpose: Decide which grants feed the centrally aggregated management roles.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! [`classify`] maps a grant and a scope to exactly one [`GrantClass`]. The
//! function is total: anything that is not recognizably management-plane is
//! [`GrantClass::Regular`]. Classification is per grant; a grant that mixes
//! catalog and non-catalog resources is not split.
//!
//! Matching is literal. A `*` API group or resource is not expanded against
//! the catalog, and a grant without API groups is never management-plane.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::catalog::ManagementResourceCatalog;
use crate::core::grant::PermissionGrant;
use crate::core::grant::RuleSet;
use crate::core::template::RoleScope;

// ============================================================================
// SECTION: Classes
// ============================================================================

/// Classification outcome for a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantClass {
    /// Regular workload grant.
    Regular,
    /// Cluster management-plane grant.
    ClusterMgmt,
    /// Project management-plane grant.
    ProjectMgmt,
}

impl GrantClass {
    /// Returns a stable label for the class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::ClusterMgmt => "cluster_mgmt",
            Self::ProjectMgmt => "project_mgmt",
        }
    }

    /// Returns the management class produced for a scope.
    #[must_use]
    pub const fn management_for(scope: RoleScope) -> Self {
        match scope {
            RoleScope::Cluster => Self::ClusterMgmt,
            RoleScope::Project => Self::ProjectMgmt,
        }
    }
}

impl fmt::Display for GrantClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Classifies a grant for a scope.
///
/// A grant is management-plane for `scope` when every API group it names is
/// accepted for that scope and at least one of its resources is in the
/// scope's catalog.
#[must_use]
pub fn classify(
    catalog: &ManagementResourceCatalog,
    grant: &PermissionGrant,
    scope: RoleScope,
) -> GrantClass {
    if grant.api_groups.is_empty() || !grant.non_resource_urls.is_empty() {
        return GrantClass::Regular;
    }
    let groups_accepted = grant.api_groups.iter().all(|group| catalog.groups.accepts(scope, group));
    let touches_catalog = grant.resources.iter().any(|resource| catalog.contains(scope, resource));
    if groups_accepted && touches_catalog {
        GrantClass::management_for(scope)
    } else {
        GrantClass::Regular
    }
}

/// Returns true when the grant is management-plane for either scope.
#[must_use]
pub fn is_management(catalog: &ManagementResourceCatalog, grant: &PermissionGrant) -> bool {
    classify(catalog, grant, RoleScope::Cluster) != GrantClass::Regular
        || classify(catalog, grant, RoleScope::Project) != GrantClass::Regular
}

// ============================================================================
// SECTION: Partition
// ============================================================================

/// Rule set split by classification.
///
/// A grant that is management-plane for both scopes appears in both
/// management subsets; `regular` holds grants that are management-plane for
/// neither.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePartition {
    /// Grants that are not management-plane for either scope.
    pub regular: RuleSet,
    /// Cluster management-plane grants.
    pub cluster_mgmt: RuleSet,
    /// Project management-plane grants.
    pub project_mgmt: RuleSet,
}

impl RulePartition {
    /// Returns the management subset for a scope.
    #[must_use]
    pub const fn management(&self, scope: RoleScope) -> &RuleSet {
        match scope {
            RoleScope::Cluster => &self.cluster_mgmt,
            RoleScope::Project => &self.project_mgmt,
        }
    }
}

/// Partitions a rule set into regular and per-scope management subsets.
#[must_use]
pub fn partition(catalog: &ManagementResourceCatalog, rules: &RuleSet) -> RulePartition {
    let mut out = RulePartition::default();
    for grant in rules {
        let cluster = classify(catalog, grant, RoleScope::Cluster) == GrantClass::ClusterMgmt;
        let project = classify(catalog, grant, RoleScope::Project) == GrantClass::ProjectMgmt;
        if cluster {
            out.cluster_mgmt.insert(grant.clone());
        }
        if project {
            out.project_mgmt.insert(grant.clone());
        }
        if !cluster && !project {
            out.regular.insert(grant.clone());
        }
    }
    out
}

/// Returns the subset of `rules` that is management-plane for `scope`.
#[must_use]
pub fn management_subset(
    catalog: &ManagementResourceCatalog,
    rules: &RuleSet,
    scope: RoleScope,
) -> RuleSet {
    let class = GrantClass::management_for(scope);
    rules.filter(|grant| classify(catalog, grant, scope) == class)
}

/// Returns the subset of `rules` that is management-plane for neither scope.
#[must_use]
pub fn regular_subset(catalog: &ManagementResourceCatalog, rules: &RuleSet) -> RuleSet {
    rules.filter(|grant| !is_management(catalog, grant))
}
