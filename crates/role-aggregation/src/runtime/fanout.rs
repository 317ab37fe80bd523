// crates/role-aggregation/src/runtime/fanout.rs
// ============================================================================
// Module: Binding Fan-out Model
// Description: Expected low-level grants derived from role-template bindings.
// Purpose: Predict grant counts and targets in local and downstream clusters.
// Dependencies: crate::{core, runtime::inventory, runtime::projector}
// ============================================================================

//! ## Overview
//! Every binding yields:
//! - direct grants in its downstream cluster: one cluster role binding for a
//!   cluster binding, or one role binding per namespace of the bound project;
//! - one management-cluster role binding per non-empty management aggregate
//!   reachable from the bound template, placed in the binding's backing
//!   namespace (`<cluster>` or `<cluster>-<project>`).
//!
//! Grants are per binding. A principal holding several bindings gets the sum
//! of their fan-outs, and removing a binding returns to the fan-out of the
//! bindings that remain.
//!
//! The platform freezes some state at binding creation. A
//! [`BindingSnapshot`] records the management kinds observed then, and the
//! [`MaterializationPolicy`] decides whether later template changes are
//! reflected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::binding::Binding;
use crate::core::binding::BindingTarget;
use crate::core::binding::Principal;
use crate::core::binding::cluster_namespace;
use crate::core::binding::project_namespace;
use crate::core::error::ModelResult;
use crate::core::identifiers::BindingName;
use crate::core::identifiers::ClusterId;
use crate::core::identifiers::ClusterRef;
use crate::core::identifiers::NamespaceName;
use crate::core::identifiers::ProjectId;
use crate::core::policy::InheritanceChangePolicy;
use crate::core::policy::MaterializationPolicy;
use crate::core::policy::TemplateDeletionPolicy;
use crate::core::template::RoleScope;
use crate::runtime::inventory::RoleObjectKind;
use crate::runtime::inventory::role_object_name;
use crate::runtime::projector::ManagementKinds;
use crate::runtime::projector::Projector;

// ============================================================================
// SECTION: Grant Descriptors
// ============================================================================

/// Kind of low-level grant object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
    /// Cluster-wide role binding.
    ClusterRoleBinding,
    /// Namespaced role binding.
    RoleBinding,
}

impl GrantKind {
    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClusterRoleBinding => "cluster_role_binding",
            Self::RoleBinding => "role_binding",
        }
    }
}

impl fmt::Display for GrantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason a grant exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantPurpose {
    /// Direct grant in the downstream cluster.
    Direct,
    /// Cluster management grant in the management cluster.
    ClusterMgmt,
    /// Project management grant in the management cluster.
    ProjectMgmt,
}

impl GrantPurpose {
    /// Returns a stable label for the purpose.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::ClusterMgmt => "cluster_mgmt",
            Self::ProjectMgmt => "project_mgmt",
        }
    }

    /// Returns the management purpose for a scope.
    #[must_use]
    pub const fn management_for(scope: RoleScope) -> Self {
        match scope {
            RoleScope::Cluster => Self::ClusterMgmt,
            RoleScope::Project => Self::ProjectMgmt,
        }
    }
}

impl fmt::Display for GrantPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected low-level grant object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExpectedGrant {
    /// Cluster holding the grant.
    pub cluster: ClusterRef,
    /// Grant object kind.
    pub kind: GrantKind,
    /// Namespace for role bindings; `None` for cluster role bindings.
    pub namespace: Option<NamespaceName>,
    /// Name of the role object the grant references.
    pub role_name: String,
    /// Principal receiving the grant.
    pub principal: Principal,
    /// Binding that caused the grant.
    pub binding: BindingName,
    /// Reason the grant exists.
    pub purpose: GrantPurpose,
}

impl fmt::Display for ExpectedGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ", self.cluster, self.kind)?;
        if let Some(namespace) = &self.namespace {
            write!(f, "{namespace}/")?;
        }
        write!(
            f,
            "{} for {} via {} ({})",
            self.role_name, self.principal, self.binding, self.purpose
        )
    }
}

// ============================================================================
// SECTION: Fan-out Results
// ============================================================================

/// Grant counts split by cluster placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GrantCounts {
    /// Grants in the management cluster.
    pub local: usize,
    /// Grants in downstream clusters.
    pub downstream: usize,
}

/// Expected grants of a single binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingFanout {
    /// Binding name.
    pub binding: BindingName,
    /// Expected grants in canonical order.
    pub grants: Vec<ExpectedGrant>,
}

impl BindingFanout {
    /// Returns local and downstream grant counts.
    #[must_use]
    pub fn counts(&self) -> GrantCounts {
        count_grants(&self.grants)
    }
}

/// Expected grants of every binding a principal holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalFanout {
    /// Principal the fan-out belongs to.
    pub principal: Principal,
    /// Per-binding fan-outs ordered by binding name.
    pub bindings: Vec<BindingFanout>,
}

impl PrincipalFanout {
    /// Returns the additive grant counts over all bindings.
    #[must_use]
    pub fn counts(&self) -> GrantCounts {
        let mut total = GrantCounts::default();
        for binding in &self.bindings {
            let counts = binding.counts();
            total.local += counts.local;
            total.downstream += counts.downstream;
        }
        total
    }

    /// Returns every expected grant in canonical order.
    #[must_use]
    pub fn grants(&self) -> Vec<ExpectedGrant> {
        let mut out: Vec<ExpectedGrant> =
            self.bindings.iter().flat_map(|binding| binding.grants.iter().cloned()).collect();
        out.sort();
        out
    }
}

/// Counts grants by placement.
fn count_grants(grants: &[ExpectedGrant]) -> GrantCounts {
    let local = grants.iter().filter(|grant| grant.cluster.is_local()).count();
    GrantCounts {
        local,
        downstream: grants.len() - local,
    }
}

// ============================================================================
// SECTION: Project Directory
// ============================================================================

/// Namespaces known to belong to each project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDirectory {
    /// Namespaces keyed by owning cluster and project.
    projects: BTreeMap<ClusterId, BTreeMap<ProjectId, BTreeSet<NamespaceName>>>,
}

impl ProjectDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            projects: BTreeMap::new(),
        }
    }

    /// Registers a project with no namespaces.
    pub fn add_project(&mut self, cluster: ClusterId, project: ProjectId) {
        self.projects.entry(cluster).or_default().entry(project).or_default();
    }

    /// Assigns a namespace to a project.
    pub fn add_namespace(
        &mut self,
        cluster: ClusterId,
        project: ProjectId,
        namespace: NamespaceName,
    ) {
        self.projects.entry(cluster).or_default().entry(project).or_default().insert(namespace);
    }

    /// Removes a namespace from a project.
    pub fn remove_namespace(
        &mut self,
        cluster: &ClusterId,
        project: &ProjectId,
        namespace: &NamespaceName,
    ) {
        if let Some(namespaces) =
            self.projects.get_mut(cluster).and_then(|projects| projects.get_mut(project))
        {
            namespaces.remove(namespace);
        }
    }

    /// Removes a project and its namespaces.
    pub fn remove_project(&mut self, cluster: &ClusterId, project: &ProjectId) {
        if let Some(projects) = self.projects.get_mut(cluster) {
            projects.remove(project);
        }
    }

    /// Returns the namespaces of a project; unknown projects have none.
    #[must_use]
    pub fn namespaces(&self, cluster: &ClusterId, project: &ProjectId) -> BTreeSet<NamespaceName> {
        self.projects
            .get(cluster)
            .and_then(|projects| projects.get(project))
            .cloned()
            .unwrap_or_default()
    }
}

// ============================================================================
// SECTION: Binding Snapshot
// ============================================================================

/// Binding together with the management kinds observed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSnapshot {
    /// Binding as created.
    pub binding: Binding,
    /// Management aggregates the bound template touched at creation.
    pub management: ManagementKinds,
}

// ============================================================================
// SECTION: Fan-out Model
// ============================================================================

/// Computes expected grants for bindings.
#[derive(Debug)]
pub struct FanoutModel<'a> {
    /// Projector over the current templates.
    projector: Projector<'a>,
    /// Project namespace directory.
    directory: &'a ProjectDirectory,
    /// Materialization policy.
    policy: MaterializationPolicy,
}

impl<'a> FanoutModel<'a> {
    /// Creates a fan-out model.
    #[must_use]
    pub const fn new(
        projector: Projector<'a>,
        directory: &'a ProjectDirectory,
        policy: MaterializationPolicy,
    ) -> Self {
        Self {
            projector,
            directory,
            policy,
        }
    }

    /// Records the management kinds a binding materializes now.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ModelError`] when the bound template cannot be aggregated.
    pub fn snapshot(&mut self, binding: &Binding) -> ModelResult<BindingSnapshot> {
        Ok(BindingSnapshot {
            binding: binding.clone(),
            management: self.projector.management_kinds(&binding.role_template)?,
        })
    }

    /// Returns the expected grants of a freshly created binding.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ModelError`] when the bound template cannot be aggregated.
    pub fn binding_fanout(&mut self, binding: &Binding) -> ModelResult<BindingFanout> {
        let snapshot = self.snapshot(binding)?;
        Ok(self.grants_for(&snapshot.binding, snapshot.management))
    }

    /// Returns the expected grants of a binding created earlier.
    ///
    /// Returns `None` when the binding no longer exists because its template
    /// was deleted under [`TemplateDeletionPolicy::CascadeBindings`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::ModelError`] when a recomputation is required and the
    /// bound template cannot be aggregated.
    pub fn snapshot_fanout(
        &mut self,
        snapshot: &BindingSnapshot,
    ) -> ModelResult<Option<BindingFanout>> {
        let binding = &snapshot.binding;
        if !self.projector.arena().contains(&binding.role_template) {
            return Ok(match self.policy.template_deletion {
                TemplateDeletionPolicy::RetainBindings => {
                    Some(self.grants_for(binding, snapshot.management))
                }
                TemplateDeletionPolicy::CascadeBindings => None,
            });
        }
        let management = match self.policy.inheritance_change {
            InheritanceChangePolicy::KeepLocalGrants => snapshot.management,
            InheritanceChangePolicy::RecomputeLocalGrants => {
                self.projector.management_kinds(&binding.role_template)?
            }
        };
        Ok(Some(self.grants_for(binding, management)))
    }

    /// Returns the expected fan-out of a principal after `binding` is created
    /// next to the principal's other bindings.
    ///
    /// Bindings in `all_bindings_for_principal` that belong to other
    /// principals are ignored, and `binding` is counted once even when the
    /// list already contains it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ModelError`] when any bound template cannot be aggregated.
    pub fn expected_binding_fanout(
        &mut self,
        binding: &Binding,
        all_bindings_for_principal: &[Binding],
    ) -> ModelResult<PrincipalFanout> {
        let mut selected: BTreeMap<&BindingName, &Binding> = all_bindings_for_principal
            .iter()
            .filter(|other| other.principal == binding.principal)
            .map(|other| (&other.name, other))
            .collect();
        selected.insert(&binding.name, binding);
        let mut bindings = Vec::with_capacity(selected.len());
        for candidate in selected.into_values() {
            bindings.push(self.binding_fanout(candidate)?);
        }
        Ok(PrincipalFanout {
            principal: binding.principal.clone(),
            bindings,
        })
    }

    /// Returns the expected fan-out of a principal from recorded snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ModelError`] when a recomputation fails.
    pub fn principal_fanout(
        &mut self,
        principal: &Principal,
        snapshots: &[BindingSnapshot],
    ) -> ModelResult<PrincipalFanout> {
        let mut ordered: Vec<&BindingSnapshot> =
            snapshots.iter().filter(|snapshot| &snapshot.binding.principal == principal).collect();
        ordered.sort_by(|a, b| a.binding.name.cmp(&b.binding.name));
        let mut bindings = Vec::with_capacity(ordered.len());
        for snapshot in ordered {
            if let Some(fanout) = self.snapshot_fanout(snapshot)? {
                bindings.push(fanout);
            }
        }
        Ok(PrincipalFanout {
            principal: principal.clone(),
            bindings,
        })
    }

    /// Builds the grant list for a binding and its management kinds.
    fn grants_for(&self, binding: &Binding, management: ManagementKinds) -> BindingFanout {
        let grant = |cluster, kind, namespace, role_name, purpose| ExpectedGrant {
            cluster,
            kind,
            namespace,
            role_name,
            principal: binding.principal.clone(),
            binding: binding.name.clone(),
            purpose,
        };
        let direct_role = role_object_name(&binding.role_template, RoleObjectKind::Aggregator);
        let mut grants = Vec::new();

        let backing_namespace = match &binding.target {
            BindingTarget::Cluster {
                cluster,
            } => {
                grants.push(grant(
                    ClusterRef::Downstream(cluster.clone()),
                    GrantKind::ClusterRoleBinding,
                    None,
                    direct_role,
                    GrantPurpose::Direct,
                ));
                cluster_namespace(cluster)
            }
            BindingTarget::Project {
                cluster,
                project,
            } => {
                for namespace in self.directory.namespaces(cluster, project) {
                    grants.push(grant(
                        ClusterRef::Downstream(cluster.clone()),
                        GrantKind::RoleBinding,
                        Some(namespace),
                        direct_role.clone(),
                        GrantPurpose::Direct,
                    ));
                }
                project_namespace(cluster, project)
            }
        };

        for scope in [RoleScope::Cluster, RoleScope::Project] {
            if management.touches(scope) {
                grants.push(grant(
                    ClusterRef::Local,
                    GrantKind::RoleBinding,
                    Some(backing_namespace.clone()),
                    role_object_name(
                        &binding.role_template,
                        RoleObjectKind::management_aggregator(scope),
                    ),
                    GrantPurpose::management_for(scope),
                ));
            }
        }
        grants.sort();
        BindingFanout {
            binding: binding.name.clone(),
            grants,
        }
    }
}
