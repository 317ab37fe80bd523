// system-tests/tests/helpers/fixtures.rs
// ============================================================================
// Module: Scenario Fixtures
// Description: Grants, templates, principals, and bindings for suites.
// Purpose: Keep suite bodies focused on the behavior they check.
// Dependencies: rbac-harness-verifier, role-aggregation
// ============================================================================

use rbac_harness_verifier::NameGenerator;
use role_aggregation::Binding;
use role_aggregation::BindingTarget;
use role_aggregation::CORE_API_GROUP;
use role_aggregation::ClusterId;
use role_aggregation::MANAGEMENT_API_GROUP;
use role_aggregation::PermissionGrant;
use role_aggregation::Principal;
use role_aggregation::ProjectId;
use role_aggregation::RoleScope;
use role_aggregation::RoleTemplate;
use role_aggregation::RoleTemplateId;

use super::harness::DOWNSTREAM;

// ============================================================================
// SECTION: Grants
// ============================================================================

/// Regular grant: read pods.
pub fn read_pods() -> PermissionGrant {
    PermissionGrant::new()
        .with_verbs(["get", "list"])
        .with_api_groups([CORE_API_GROUP])
        .with_resources(["pods"])
}

/// Regular grant: write config maps.
pub fn write_configmaps() -> PermissionGrant {
    PermissionGrant::new()
        .with_verbs(["create", "update"])
        .with_api_groups([CORE_API_GROUP])
        .with_resources(["configmaps"])
}

/// Cluster management grant: read projects.
pub fn read_projects() -> PermissionGrant {
    PermissionGrant::new()
        .with_verbs(["get", "list"])
        .with_api_groups([MANAGEMENT_API_GROUP])
        .with_resources(["projects"])
}

/// Project management grant: manage project role template bindings.
pub fn manage_prtbs() -> PermissionGrant {
    PermissionGrant::new()
        .with_verbs(["*"])
        .with_api_groups([MANAGEMENT_API_GROUP])
        .with_resources(["projectroletemplatebindings"])
}

// ============================================================================
// SECTION: Names
// ============================================================================

/// Issues a run-unique template id.
pub fn template_id(names: &NameGenerator, stem: &str) -> RoleTemplateId {
    RoleTemplateId::new(names.issue(stem))
}

/// Issues a run-unique user.
pub fn user(names: &NameGenerator, stem: &str) -> Principal {
    Principal::User(names.issue(stem))
}

/// Issues a run-unique project id.
pub fn project(names: &NameGenerator) -> ProjectId {
    ProjectId::new(names.issue("project"))
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds a template with rules and parents.
pub fn template(
    id: &RoleTemplateId,
    scope: RoleScope,
    rules: &[PermissionGrant],
    parents: &[&RoleTemplateId],
) -> RoleTemplate {
    let mut template = RoleTemplate::new(id.clone(), scope);
    for rule in rules {
        template = template.with_rule(rule.clone());
    }
    for parent in parents {
        template = template.inheriting((*parent).clone());
    }
    template
}

/// Builds a cluster-scoped template.
pub fn cluster_template(
    id: &RoleTemplateId,
    rules: &[PermissionGrant],
    parents: &[&RoleTemplateId],
) -> RoleTemplate {
    template(id, RoleScope::Cluster, rules, parents)
}

/// Builds a project-scoped template.
pub fn project_template(
    id: &RoleTemplateId,
    rules: &[PermissionGrant],
    parents: &[&RoleTemplateId],
) -> RoleTemplate {
    template(id, RoleScope::Project, rules, parents)
}

/// Downstream cluster id.
pub fn cluster() -> ClusterId {
    ClusterId::new(DOWNSTREAM)
}

/// Builds a cluster binding with a generated name.
pub fn cluster_binding(
    names: &NameGenerator,
    template: &RoleTemplateId,
    principal: &Principal,
) -> Binding {
    Binding::new(
        names.issue("crtb"),
        template.clone(),
        principal.clone(),
        BindingTarget::Cluster {
            cluster: cluster(),
        },
    )
}

/// Builds a project binding with a generated name.
pub fn project_binding(
    names: &NameGenerator,
    template: &RoleTemplateId,
    principal: &Principal,
    project: &ProjectId,
) -> Binding {
    Binding::new(
        names.issue("prtb"),
        template.clone(),
        principal.clone(),
        BindingTarget::Project {
            cluster: cluster(),
            project: project.clone(),
        },
    )
}
