// crates/rbac-harness-verifier/src/memory/mod.rs
// ============================================================================
// Module: In-Memory Reference Platform
// Description: Process-local implementation of the platform query surface.
// Purpose: Run full verification scenarios without a remote platform.
// Dependencies: role-aggregation, crate::platform
// ============================================================================

//! ## Overview
//! [`MemoryPlatform`] stores templates, bindings, projects, and namespaces
//! behind a mutex and materializes role objects and grants from them. A change
//! becomes visible only after a configurable number of reads, which mimics the
//! asynchronous controllers of a real platform and exercises convergence
//! polling.
//!
//! Both materialization policy points are honoured: template deletion either
//! keeps or cascades bindings, and local management grants are either frozen
//! at binding creation or recomputed.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod authz;
mod materialize;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use role_aggregation::Binding;
use role_aggregation::BindingName;
use role_aggregation::BindingTarget;
use role_aggregation::ClusterId;
use role_aggregation::ClusterRef;
use role_aggregation::ManagementResourceCatalog;
use role_aggregation::MaterializationPolicy;
use role_aggregation::NamespaceName;
use role_aggregation::Principal;
use role_aggregation::ProjectId;
use role_aggregation::RoleTemplate;
use role_aggregation::RoleTemplateId;
use role_aggregation::TemplateDeletionPolicy;

pub use self::materialize::aggregation_label;
use self::materialize::DesiredState;
use self::materialize::MaterializedView;
use self::materialize::StoredBinding;
use crate::platform::GrantRecord;
use crate::platform::LABEL_ROLE_TEMPLATE;
use crate::platform::ObjectSelector;
use crate::platform::PlatformClient;
use crate::platform::PlatformError;
use crate::platform::ProbeRequest;
use crate::platform::RoleObjectRecord;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Default number of reads before a change becomes visible.
pub const DEFAULT_SETTLE_READS: u32 = 2;

/// Construction options for [`MemoryPlatform`].
#[derive(Debug, Clone)]
pub struct MemoryPlatformOptions {
    /// Downstream clusters.
    pub downstream: Vec<ClusterId>,
    /// Management resource catalog used for classification.
    pub catalog: ManagementResourceCatalog,
    /// Materialization policy.
    pub policy: MaterializationPolicy,
    /// Reads served from the previous state after each change.
    pub settle_reads: u32,
}

impl MemoryPlatformOptions {
    /// Creates options with the built-in catalog and default policy.
    #[must_use]
    pub fn new<I>(downstream: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ClusterId>,
    {
        Self {
            downstream: downstream.into_iter().map(Into::into).collect(),
            catalog: ManagementResourceCatalog::default(),
            policy: MaterializationPolicy::default(),
            settle_reads: DEFAULT_SETTLE_READS,
        }
    }

    /// Replaces the catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: ManagementResourceCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Replaces the policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: MaterializationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the settle delay.
    #[must_use]
    pub const fn with_settle_reads(mut self, settle_reads: u32) -> Self {
        self.settle_reads = settle_reads;
        self
    }
}

// ============================================================================
// SECTION: State
// ============================================================================

/// Mutable platform state.
#[derive(Debug)]
struct PlatformState {
    /// Classification catalog.
    catalog: ManagementResourceCatalog,
    /// Materialization policy.
    policy: MaterializationPolicy,
    /// Reads served stale after a change.
    settle_reads: u32,
    /// Authored state.
    desired: DesiredState,
    /// Visible derived state.
    view: MaterializedView,
    /// Reads left before the next reconcile, when a change is pending.
    pending_reads: Option<u32>,
    /// Stop reconciling pending changes.
    frozen: bool,
    /// Error returned by the next call.
    fault: Option<PlatformError>,
}

impl PlatformState {
    /// Returns and clears an injected fault.
    fn take_fault(&mut self) -> Result<(), PlatformError> {
        self.fault.take().map_or(Ok(()), Err)
    }

    /// Records a change to the desired state.
    fn mark_changed(&mut self) {
        if self.settle_reads == 0 && !self.frozen {
            self.reconcile();
        } else {
            self.pending_reads = Some(self.settle_reads);
        }
    }

    /// Counts one read, reconciling once the settle delay has passed.
    fn observe(&mut self) {
        match self.pending_reads {
            Some(0) if !self.frozen => self.reconcile(),
            Some(remaining) if remaining > 0 => self.pending_reads = Some(remaining - 1),
            _ => {}
        }
    }

    /// Recomputes the visible state.
    fn reconcile(&mut self) {
        self.view = materialize::materialize(
            &self.desired,
            &self.catalog,
            self.policy.inheritance_change,
        );
        self.pending_reads = None;
    }

    /// Fails unless `cluster` is a known downstream cluster.
    fn require_cluster(&self, cluster: &ClusterId) -> Result<(), PlatformError> {
        if self.desired.downstream.contains(cluster) {
            Ok(())
        } else {
            Err(PlatformError::NotFound {
                kind: "cluster",
                name: cluster.to_string(),
            })
        }
    }

    /// Fails unless `cluster` is the local cluster or a known downstream one.
    fn require_cluster_ref(&self, cluster: &ClusterRef) -> Result<(), PlatformError> {
        match cluster {
            ClusterRef::Local => Ok(()),
            ClusterRef::Downstream(id) => self.require_cluster(id),
        }
    }
}

// ============================================================================
// SECTION: Memory Platform
// ============================================================================

/// In-memory platform shared by clones.
#[derive(Debug, Clone)]
pub struct MemoryPlatform {
    /// Shared state guarded by a mutex.
    state: Arc<Mutex<PlatformState>>,
}

impl MemoryPlatform {
    /// Creates a platform with no templates or bindings.
    #[must_use]
    pub fn new(options: MemoryPlatformOptions) -> Self {
        let desired = DesiredState {
            downstream: options.downstream.into_iter().collect(),
            ..DesiredState::default()
        };
        let view =
            materialize::materialize(&desired, &options.catalog, options.policy.inheritance_change);
        Self {
            state: Arc::new(Mutex::new(PlatformState {
                catalog: options.catalog,
                policy: options.policy,
                settle_reads: options.settle_reads,
                desired,
                view,
                pending_reads: None,
                frozen: false,
                fault: None,
            })),
        }
    }

    /// Makes the next platform call fail with `error`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Transport`] when the state mutex is poisoned.
    pub fn inject_fault(&self, error: PlatformError) -> Result<(), PlatformError> {
        self.lock()?.fault = Some(error);
        Ok(())
    }

    /// Stops or resumes materialization of pending changes.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Transport`] when the state mutex is poisoned.
    pub fn set_frozen(&self, frozen: bool) -> Result<(), PlatformError> {
        self.lock()?.frozen = frozen;
        Ok(())
    }

    /// Materializes pending changes immediately.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Transport`] when the state mutex is poisoned.
    pub fn settle(&self) -> Result<(), PlatformError> {
        self.lock()?.reconcile();
        Ok(())
    }

    /// Locks the shared state.
    fn lock(&self) -> Result<MutexGuard<'_, PlatformState>, PlatformError> {
        self.state
            .lock()
            .map_err(|_| PlatformError::Transport("memory platform mutex poisoned".to_string()))
    }

    /// Locks the state and consumes any injected fault.
    fn begin(&self) -> Result<MutexGuard<'_, PlatformState>, PlatformError> {
        let mut state = self.lock()?;
        state.take_fault()?;
        Ok(state)
    }
}

impl PlatformClient for MemoryPlatform {
    fn list_downstream_clusters(&self) -> Result<Vec<ClusterId>, PlatformError> {
        let state = self.begin()?;
        Ok(state.desired.downstream.iter().cloned().collect())
    }

    fn get_role_template(
        &self,
        id: &RoleTemplateId,
    ) -> Result<Option<RoleTemplate>, PlatformError> {
        let state = self.begin()?;
        Ok(state.desired.templates.get(id).cloned())
    }

    fn list_role_templates(&self) -> Result<Vec<RoleTemplate>, PlatformError> {
        let state = self.begin()?;
        Ok(state.desired.templates.values().cloned().collect())
    }

    fn create_role_template(&self, template: &RoleTemplate) -> Result<(), PlatformError> {
        let mut state = self.begin()?;
        if state.desired.templates.contains_key(&template.id) {
            return Err(PlatformError::Conflict {
                kind: "role template",
                name: template.id.to_string(),
            });
        }
        state.desired.templates.insert(template.id.clone(), template.clone());
        state.mark_changed();
        Ok(())
    }

    fn update_role_template(&self, template: &RoleTemplate) -> Result<(), PlatformError> {
        let mut state = self.begin()?;
        let Some(stored) = state.desired.templates.get_mut(&template.id) else {
            return Err(PlatformError::NotFound {
                kind: "role template",
                name: template.id.to_string(),
            });
        };
        *stored = template.clone();
        state.mark_changed();
        Ok(())
    }

    fn delete_role_template(&self, id: &RoleTemplateId) -> Result<(), PlatformError> {
        let mut state = self.begin()?;
        if state.desired.templates.remove(id).is_none() {
            return Err(PlatformError::NotFound {
                kind: "role template",
                name: id.to_string(),
            });
        }
        if state.policy.template_deletion == TemplateDeletionPolicy::CascadeBindings {
            state.desired.bindings.retain(|_, stored| &stored.binding.role_template != id);
        }
        state.mark_changed();
        Ok(())
    }

    fn list_role_objects(
        &self,
        cluster: &ClusterRef,
        selector: &ObjectSelector,
    ) -> Result<Vec<RoleObjectRecord>, PlatformError> {
        let mut state = self.begin()?;
        state.require_cluster_ref(cluster)?;
        state.observe();
        Ok(state
            .view
            .role_objects
            .get(cluster)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(|object| selector.matches_name(&object.name))
            .filter(|object| selector.matches_labels(&object.labels))
            .cloned()
            .collect())
    }

    fn list_grants(
        &self,
        cluster: &ClusterRef,
        selector: &ObjectSelector,
    ) -> Result<Vec<GrantRecord>, PlatformError> {
        let mut state = self.begin()?;
        state.require_cluster_ref(cluster)?;
        state.observe();
        Ok(state
            .view
            .grants
            .get(cluster)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(|grant| selector.matches_name(&grant.name))
            .filter(|grant| selector.matches_labels(&grant.labels))
            .filter(|grant| selector.namespace.is_none() || selector.namespace == grant.namespace)
            .filter(|grant| {
                selector.principal.as_ref().is_none_or(|wanted| wanted == &grant.principal)
            })
            .cloned()
            .collect())
    }

    fn list_bindings(&self, selector: &ObjectSelector) -> Result<Vec<Binding>, PlatformError> {
        let state = self.begin()?;
        Ok(state
            .desired
            .bindings
            .values()
            .map(|stored| &stored.binding)
            .filter(|binding| selector.matches_name(binding.name.as_str()))
            .filter(|binding| {
                let labels = BTreeMap::from([(
                    LABEL_ROLE_TEMPLATE.to_string(),
                    binding.role_template.to_string(),
                )]);
                selector.matches_labels(&labels)
            })
            .filter(|binding| {
                selector.principal.as_ref().is_none_or(|wanted| wanted == &binding.principal)
            })
            .cloned()
            .collect())
    }

    fn create_binding(&self, binding: &Binding) -> Result<(), PlatformError> {
        let mut state = self.begin()?;
        if state.desired.bindings.contains_key(&binding.name) {
            return Err(PlatformError::Conflict {
                kind: "binding",
                name: binding.name.to_string(),
            });
        }
        if !state.desired.templates.contains_key(&binding.role_template) {
            return Err(PlatformError::NotFound {
                kind: "role template",
                name: binding.role_template.to_string(),
            });
        }
        state.require_cluster(binding.target.cluster())?;
        if let BindingTarget::Project {
            cluster,
            project,
        } = &binding.target
            && !state.desired.projects.contains_key(&(cluster.clone(), project.clone()))
        {
            return Err(PlatformError::NotFound {
                kind: "project",
                name: format!("{cluster}:{project}"),
            });
        }
        let management =
            materialize::management_kinds(&state.desired, &state.catalog, &binding.role_template);
        state.desired.bindings.insert(
            binding.name.clone(),
            StoredBinding {
                binding: binding.clone(),
                management,
            },
        );
        state.mark_changed();
        Ok(())
    }

    fn delete_binding(&self, name: &BindingName) -> Result<(), PlatformError> {
        let mut state = self.begin()?;
        if state.desired.bindings.remove(name).is_none() {
            return Err(PlatformError::NotFound {
                kind: "binding",
                name: name.to_string(),
            });
        }
        state.mark_changed();
        Ok(())
    }

    fn create_project(
        &self,
        cluster: &ClusterId,
        project: &ProjectId,
    ) -> Result<(), PlatformError> {
        let mut state = self.begin()?;
        state.require_cluster(cluster)?;
        let key = (cluster.clone(), project.clone());
        if state.desired.projects.contains_key(&key) {
            return Err(PlatformError::Conflict {
                kind: "project",
                name: format!("{cluster}:{project}"),
            });
        }
        state.desired.projects.insert(key, BTreeSet::new());
        state.mark_changed();
        Ok(())
    }

    fn delete_project(
        &self,
        cluster: &ClusterId,
        project: &ProjectId,
    ) -> Result<(), PlatformError> {
        let mut state = self.begin()?;
        if state.desired.projects.remove(&(cluster.clone(), project.clone())).is_none() {
            return Err(PlatformError::NotFound {
                kind: "project",
                name: format!("{cluster}:{project}"),
            });
        }
        state.mark_changed();
        Ok(())
    }

    fn create_namespace(
        &self,
        cluster: &ClusterId,
        project: &ProjectId,
        namespace: &NamespaceName,
    ) -> Result<(), PlatformError> {
        let mut state = self.begin()?;
        let taken = state
            .desired
            .projects
            .iter()
            .any(|((owner, _), namespaces)| owner == cluster && namespaces.contains(namespace));
        if taken {
            return Err(PlatformError::Conflict {
                kind: "namespace",
                name: namespace.to_string(),
            });
        }
        let Some(namespaces) = state.desired.projects.get_mut(&(cluster.clone(), project.clone()))
        else {
            return Err(PlatformError::NotFound {
                kind: "project",
                name: format!("{cluster}:{project}"),
            });
        };
        namespaces.insert(namespace.clone());
        state.mark_changed();
        Ok(())
    }

    fn delete_namespace(
        &self,
        cluster: &ClusterId,
        namespace: &NamespaceName,
    ) -> Result<(), PlatformError> {
        let mut state = self.begin()?;
        let removed = state
            .desired
            .projects
            .iter_mut()
            .filter(|((owner, _), _)| owner == cluster)
            .any(|(_, namespaces)| namespaces.remove(namespace));
        if !removed {
            return Err(PlatformError::NotFound {
                kind: "namespace",
                name: namespace.to_string(),
            });
        }
        state.mark_changed();
        Ok(())
    }

    fn probe(&self, principal: &Principal, request: &ProbeRequest) -> Result<(), PlatformError> {
        let mut state = self.begin()?;
        state.observe();
        authz::authorize(&state.view, principal, request)
    }
}
