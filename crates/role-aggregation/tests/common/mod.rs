// crates/role-aggregation/tests/common/mod.rs
// =============================================================================
// Module: Role Aggregation Test Helpers
// Description: Grant and template fixtures shared by integration tests.
// Purpose: Reduce duplication across role-aggregation test suites.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use role_aggregation::CLUSTER_ENGINE_API_GROUP;
use role_aggregation::CORE_API_GROUP;
use role_aggregation::MANAGEMENT_API_GROUP;
use role_aggregation::PROJECT_ENGINE_API_GROUP;
use role_aggregation::PermissionGrant;
use role_aggregation::RoleScope;
use role_aggregation::RoleTemplate;
use role_aggregation::TemplateArena;

/// Returns a grant over one resource in one API group.
pub fn grant(verbs: &[&str], group: &str, resource: &str) -> PermissionGrant {
    PermissionGrant::new()
        .with_verbs(verbs.iter().copied())
        .with_api_groups([group])
        .with_resources([resource])
}

/// Read access to pods (regular).
pub fn read_pods() -> PermissionGrant {
    grant(&["get", "list", "watch"], CORE_API_GROUP, "pods")
}

/// Read access to deployments (regular).
pub fn read_deployments() -> PermissionGrant {
    grant(&["get", "list"], "apps", "deployments")
}

/// Read access to projects (cluster management).
pub fn read_projects() -> PermissionGrant {
    grant(&["get", "list"], MANAGEMENT_API_GROUP, "projects")
}

/// Read access to etcd snapshots (cluster management through the engine group).
pub fn read_etcd_snapshots() -> PermissionGrant {
    grant(&["get"], CLUSTER_ENGINE_API_GROUP, "etcdsnapshots")
}

/// Full access to project role template bindings (project management).
pub fn manage_prtbs() -> PermissionGrant {
    grant(&["*"], MANAGEMENT_API_GROUP, "projectroletemplatebindings")
}

/// Read access to project apps (project management).
pub fn read_apps() -> PermissionGrant {
    grant(&["get"], PROJECT_ENGINE_API_GROUP, "apps")
}

/// Builds a cluster-scope template with own rules and parents.
pub fn cluster_template(id: &str, rules: &[PermissionGrant], parents: &[&str]) -> RoleTemplate {
    template(id, RoleScope::Cluster, rules, parents)
}

/// Builds a template with own rules and parents.
pub fn template(
    id: &str,
    scope: RoleScope,
    rules: &[PermissionGrant],
    parents: &[&str],
) -> RoleTemplate {
    let mut out = RoleTemplate::new(id, scope);
    for rule in rules {
        out = out.with_rule(rule.clone());
    }
    for parent in parents {
        out = out.inheriting(*parent);
    }
    out
}

/// Builds an arena from templates.
pub fn arena(templates: Vec<RoleTemplate>) -> Result<TemplateArena, String> {
    TemplateArena::from_templates(templates).map_err(|err| err.to_string())
}
