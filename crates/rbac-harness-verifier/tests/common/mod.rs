// crates/rbac-harness-verifier/tests/common/mod.rs
// =============================================================================
// Module: Verifier Test Helpers
// Description: Platform, template, and settings fixtures for verifier suites.
// Purpose: Reduce duplication across verifier integration tests.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::sync::Arc;

use rbac_harness_config::ConvergenceConfig;
use rbac_harness_config::PollBudget;
use rbac_harness_verifier::AuditSink;
use rbac_harness_verifier::MemoryPlatform;
use rbac_harness_verifier::MemoryPlatformOptions;
use rbac_harness_verifier::RecordingAuditSink;
use rbac_harness_verifier::ScenarioSettings;
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

/// Downstream cluster used by most suites.
pub const CLUSTER: &str = "c-1";

/// Returns a grant over one resource in one API group.
pub fn grant(verbs: &[&str], group: &str, resource: &str) -> PermissionGrant {
    PermissionGrant::new()
        .with_verbs(verbs.iter().copied())
        .with_api_groups([group])
        .with_resources([resource])
}

/// Read access to pods (regular).
pub fn read_pods() -> PermissionGrant {
    grant(&["get", "list"], CORE_API_GROUP, "pods")
}

/// Write access to config maps (regular).
pub fn write_configmaps() -> PermissionGrant {
    grant(&["create", "update", "delete"], CORE_API_GROUP, "configmaps")
}

/// Read access to projects (cluster management).
pub fn read_projects() -> PermissionGrant {
    grant(&["get", "list"], MANAGEMENT_API_GROUP, "projects")
}

/// Full access to project role template bindings (project management).
pub fn manage_prtbs() -> PermissionGrant {
    grant(&["*"], MANAGEMENT_API_GROUP, "projectroletemplatebindings")
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

/// Builds a cluster-scope template.
pub fn cluster_template(id: &str, rules: &[PermissionGrant], parents: &[&str]) -> RoleTemplate {
    template(id, RoleScope::Cluster, rules, parents)
}

/// Returns a user principal.
pub fn user(name: &str) -> Principal {
    Principal::User(name.to_string())
}

/// Returns a cluster binding on [`CLUSTER`].
pub fn cluster_binding(name: &str, template: &str, principal: &Principal) -> Binding {
    Binding::new(
        name,
        template,
        principal.clone(),
        BindingTarget::Cluster {
            cluster: ClusterId::new(CLUSTER),
        },
    )
}

/// Returns a project binding on [`CLUSTER`].
pub fn project_binding(
    name: &str,
    template: &str,
    principal: &Principal,
    project: &str,
) -> Binding {
    Binding::new(
        name,
        template,
        principal.clone(),
        BindingTarget::Project {
            cluster: ClusterId::new(CLUSTER),
            project: ProjectId::new(project),
        },
    )
}

/// Returns a memory platform with one downstream cluster.
pub fn platform() -> MemoryPlatform {
    MemoryPlatform::new(MemoryPlatformOptions::new([CLUSTER]))
}

/// Returns budgets small enough for unit-speed polling.
pub fn fast_convergence() -> ConvergenceConfig {
    ConvergenceConfig {
        read: PollBudget::new(1, 500),
        binding_create: PollBudget::new(1, 500),
        deletion: PollBudget::new(1, 500),
    }
}

/// Returns budgets that time out almost immediately.
pub fn tight_convergence() -> ConvergenceConfig {
    ConvergenceConfig {
        read: PollBudget::new(1, 20),
        binding_create: PollBudget::new(1, 20),
        deletion: PollBudget::new(1, 20),
    }
}

/// Returns default settings with fast budgets.
pub fn settings() -> ScenarioSettings {
    ScenarioSettings::default().with_convergence(fast_convergence())
}

/// Returns a recording sink and its shared handle.
pub fn recorder() -> (Arc<RecordingAuditSink>, Arc<dyn AuditSink>) {
    let sink = Arc::new(RecordingAuditSink::new());
    let shared: Arc<dyn AuditSink> = sink.clone();
    (sink, shared)
}
