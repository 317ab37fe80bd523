// crates/role-aggregation/src/core/catalog.rs
// ============================================================================
// Module: Management Resource Catalog
// Description: Static per-scope catalog of management-plane resources.
// Purpose: Tell the classifier which resources are centrally aggregated.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The catalog holds two fixed maps, one per [`RoleScope`], from resource name
//! to owning API group, plus the API groups the classifier accepts for each
//! scope. It is configuration: nothing in it is derived from templates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::template::RoleScope;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Core (unnamed) API group.
pub const CORE_API_GROUP: &str = "";
/// API group of the management plane.
pub const MANAGEMENT_API_GROUP: &str = "management.cattle.io";
/// API group of the cluster provisioning engine.
pub const CLUSTER_ENGINE_API_GROUP: &str = "rke.cattle.io";
/// API group of the project engine.
pub const PROJECT_ENGINE_API_GROUP: &str = "project.cattle.io";

/// Built-in cluster-scope management resources and their owning groups.
const BUILTIN_CLUSTER_RESOURCES: &[(&str, &str)] = &[
    ("clusterregistrationtokens", MANAGEMENT_API_GROUP),
    ("clusterroletemplatebindings", MANAGEMENT_API_GROUP),
    ("clusterscans", MANAGEMENT_API_GROUP),
    ("etcdbackups", MANAGEMENT_API_GROUP),
    ("etcdsnapshots", CLUSTER_ENGINE_API_GROUP),
    ("nodepools", MANAGEMENT_API_GROUP),
    ("nodes", MANAGEMENT_API_GROUP),
    ("projects", MANAGEMENT_API_GROUP),
];

/// Built-in project-scope management resources and their owning groups.
const BUILTIN_PROJECT_RESOURCES: &[(&str, &str)] = &[
    ("apps", PROJECT_ENGINE_API_GROUP),
    ("projectroletemplatebindings", MANAGEMENT_API_GROUP),
    ("secrets", CORE_API_GROUP),
    ("sourcecodeproviderconfigs", PROJECT_ENGINE_API_GROUP),
];

// ============================================================================
// SECTION: API Groups
// ============================================================================

/// API groups the classifier recognizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementApiGroups {
    /// Management-plane API group.
    pub management: String,
    /// Cluster provisioning engine API group.
    pub cluster_engine: String,
    /// Project engine API group.
    pub project_engine: String,
}

impl Default for ManagementApiGroups {
    fn default() -> Self {
        Self {
            management: MANAGEMENT_API_GROUP.to_string(),
            cluster_engine: CLUSTER_ENGINE_API_GROUP.to_string(),
            project_engine: PROJECT_ENGINE_API_GROUP.to_string(),
        }
    }
}

impl ManagementApiGroups {
    /// Returns true when `group` may appear in a management grant of `scope`.
    #[must_use]
    pub fn accepts(&self, scope: RoleScope, group: &str) -> bool {
        match scope {
            RoleScope::Cluster => group == self.management || group == self.cluster_engine,
            RoleScope::Project => {
                group == self.project_engine
                    || group == self.management
                    || group == CORE_API_GROUP
            }
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Per-scope catalog of management-plane resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementResourceCatalog {
    /// Recognized API groups.
    pub groups: ManagementApiGroups,
    /// Cluster-scope management resources mapped to their owning group.
    pub cluster: BTreeMap<String, String>,
    /// Project-scope management resources mapped to their owning group.
    pub project: BTreeMap<String, String>,
}

impl Default for ManagementResourceCatalog {
    fn default() -> Self {
        Self {
            groups: ManagementApiGroups::default(),
            cluster: to_map(BUILTIN_CLUSTER_RESOURCES),
            project: to_map(BUILTIN_PROJECT_RESOURCES),
        }
    }
}

impl ManagementResourceCatalog {
    /// Creates a catalog from explicit groups and resource maps.
    #[must_use]
    pub const fn new(
        groups: ManagementApiGroups,
        cluster: BTreeMap<String, String>,
        project: BTreeMap<String, String>,
    ) -> Self {
        Self {
            groups,
            cluster,
            project,
        }
    }

    /// Returns the resource map for a scope.
    #[must_use]
    pub const fn resources(&self, scope: RoleScope) -> &BTreeMap<String, String> {
        match scope {
            RoleScope::Cluster => &self.cluster,
            RoleScope::Project => &self.project,
        }
    }

    /// Returns true when `resource` is a management resource of `scope`.
    #[must_use]
    pub fn contains(&self, scope: RoleScope, resource: &str) -> bool {
        self.resources(scope).contains_key(resource)
    }
}

/// Converts a static resource table into an owned map.
fn to_map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(resource, group)| ((*resource).to_string(), (*group).to_string()))
        .collect()
}
