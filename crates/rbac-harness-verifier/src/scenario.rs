// crates/rbac-harness-verifier/src/scenario.rs
// ============================================================================
// Module: Verification Scenario
// Description: Setup, convergence, assertion, and teardown state machine.
// Purpose: Verify platform state against model predictions per scenario.
// Dependencies: role-aggregation, rbac-harness-config, crate::*
// ============================================================================

//! ## Overview
//! A [`Scenario`] owns the templates, bindings, projects, and namespaces it
//! creates and predicts their materialization with the model. It moves
//! through these phases:
//! - `Setup`: mutations are recorded in the model and sent to the platform;
//! - `AwaitConvergence`: polls until observed state matches the prediction;
//! - `Assert`: runs comparators and probes against converged state;
//! - `Teardown`: deletes every recorded resource in reverse creation order.
//!
//! Assertions are refused outside `Assert`. A mutation during `Assert` moves
//! the scenario back to `Setup`, so the next assertion needs a new
//! convergence wait.
//!
//! Teardown also runs when the scenario is dropped before finishing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use rbac_harness_config::ConvergenceConfig;
use rbac_harness_config::HarnessConfig;
use rbac_harness_config::OperationClass;
use role_aggregation::Aggregator;
use role_aggregation::Binding;
use role_aggregation::BindingName;
use role_aggregation::BindingSnapshot;
use role_aggregation::ClusterId;
use role_aggregation::ClusterRef;
use role_aggregation::ExpectedRoleObject;
use role_aggregation::FanoutModel;
use role_aggregation::GrantCounts;
use role_aggregation::InheritanceChangePolicy;
use role_aggregation::ManagementResourceCatalog;
use role_aggregation::MaterializationPolicy;
use role_aggregation::ModelError;
use role_aggregation::NamespaceName;
use role_aggregation::ObjectInventory;
use role_aggregation::Principal;
use role_aggregation::PrincipalFanout;
use role_aggregation::ProjectDirectory;
use role_aggregation::ProjectId;
use role_aggregation::Projector;
use role_aggregation::RoleObjectKind;
use role_aggregation::RoleTemplate;
use role_aggregation::RoleTemplateId;
use role_aggregation::TemplateArena;
use role_aggregation::TemplateDeletionPolicy;
use role_aggregation::role_object_name;
use role_aggregation::validate_arena;
use serde::Serialize;

use crate::audit::AuditEvent;
use crate::audit::AuditSink;
use crate::audit::ScenarioPhaseEvent;
use crate::audit::ScenarioPhaseEventParams;
use crate::audit::TeardownEvent;
use crate::audit::TeardownEventParams;
use crate::compare::Verifier;
use crate::compare::compare_bindings;
use crate::compare::compare_grants;
use crate::compare::compare_role_objects;
use crate::convergence::Observation;
use crate::convergence::PollReport;
use crate::convergence::Poller;
use crate::error::ScenarioFailure;
use crate::error::TeardownFailure;
use crate::error::VerifierError;
use crate::names::NameGenerator;
use crate::platform::GrantRecord;
use crate::platform::ObjectSelector;
use crate::platform::PlatformClient;
use crate::platform::PlatformError;
use crate::platform::ProbeRequest;
use crate::platform::RoleObjectRecord;
use crate::probe::ProbeOutcome;
use crate::probe::expect_probe;

// ============================================================================
// SECTION: Phases
// ============================================================================

/// Phase of a verification scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioPhase {
    /// Creating and mutating resources.
    Setup,
    /// Waiting for the platform to converge.
    AwaitConvergence,
    /// Checking converged state.
    Assert,
    /// Removing created resources.
    Teardown,
    /// Teardown finished.
    Finished,
}

impl ScenarioPhase {
    /// Returns a stable label for the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::AwaitConvergence => "await_convergence",
            Self::Assert => "assert",
            Self::Teardown => "teardown",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for ScenarioPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Settings a scenario runs with.
#[derive(Debug, Clone)]
pub struct ScenarioSettings {
    /// Polling budgets per operation class.
    pub convergence: ConvergenceConfig,
    /// Management resource catalog.
    pub catalog: ManagementResourceCatalog,
    /// Materialization policy the platform is expected to follow.
    pub policy: MaterializationPolicy,
    /// Prefix for generated names.
    pub name_prefix: String,
    /// Attach raw content to verification audit events.
    pub include_rules: bool,
}

impl ScenarioSettings {
    /// Derives settings from a validated harness config.
    #[must_use]
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            convergence: config.convergence,
            catalog: config.catalog.to_catalog(),
            policy: config.policy,
            name_prefix: config.scenario.name_prefix.clone(),
            include_rules: config.audit.include_rules,
        }
    }

    /// Replaces the convergence budgets.
    #[must_use]
    pub const fn with_convergence(mut self, convergence: ConvergenceConfig) -> Self {
        self.convergence = convergence;
        self
    }

    /// Replaces the materialization policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: MaterializationPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self::from_config(&HarnessConfig::default())
    }
}

// ============================================================================
// SECTION: Teardown Ledger
// ============================================================================

/// Resource created by a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEntry {
    /// Role template.
    Template(RoleTemplateId),
    /// Binding.
    Binding(BindingName),
    /// Project in a downstream cluster.
    Project {
        /// Owning cluster.
        cluster: ClusterId,
        /// Project id.
        project: ProjectId,
    },
    /// Namespace in a downstream cluster.
    Namespace {
        /// Owning cluster.
        cluster: ClusterId,
        /// Namespace name.
        namespace: NamespaceName,
    },
}

impl LedgerEntry {
    /// Deletes the resource.
    fn delete<P: PlatformClient + ?Sized>(&self, platform: &P) -> Result<(), PlatformError> {
        match self {
            Self::Template(id) => platform.delete_role_template(id),
            Self::Binding(name) => platform.delete_binding(name),
            Self::Project {
                cluster,
                project,
            } => platform.delete_project(cluster, project),
            Self::Namespace {
                cluster,
                namespace,
            } => platform.delete_namespace(cluster, namespace),
        }
    }
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template(id) => write!(f, "role template {id}"),
            Self::Binding(name) => write!(f, "binding {name}"),
            Self::Project {
                cluster,
                project,
            } => write!(f, "project {cluster}:{project}"),
            Self::Namespace {
                cluster,
                namespace,
            } => write!(f, "namespace {cluster}/{namespace}"),
        }
    }
}

/// Ordered record of created resources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownLedger {
    /// Entries in creation order.
    entries: Vec<LedgerEntry>,
}

impl TeardownLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Records a created resource.
    pub fn record(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    /// Returns the entries in creation order.
    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Returns the number of recorded resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deletes every recorded resource in reverse creation order.
    ///
    /// Resources that are already gone count as removed. Every failure is
    /// returned; none stops the remaining deletions.
    pub fn teardown<P: PlatformClient + ?Sized>(
        &mut self,
        platform: &P,
        scenario: &str,
        audit: &dyn AuditSink,
    ) -> Vec<TeardownFailure> {
        let mut failures = Vec::new();
        while let Some(entry) = self.entries.pop() {
            let result = entry.delete(platform);
            let (outcome, error) = match &result {
                Ok(()) => ("deleted", None),
                Err(err) if err.is_not_found() => ("already_gone", None),
                Err(err) => ("failed", Some(err.to_string())),
            };
            audit.record(&AuditEvent::Teardown(TeardownEvent::new(TeardownEventParams {
                scenario: scenario.to_string(),
                resource: entry.to_string(),
                outcome,
                error,
            })));
            if let Err(error) = result
                && !error.is_not_found()
            {
                failures.push(TeardownFailure {
                    resource: entry.to_string(),
                    error,
                });
            }
        }
        failures
    }
}

// ============================================================================
// SECTION: Scenario
// ============================================================================

/// Verification scenario bound to one platform.
pub struct Scenario<'p, P: PlatformClient + ?Sized> {
    /// Scenario name.
    name: String,
    /// Platform under test.
    platform: &'p P,
    /// Scenario settings.
    settings: ScenarioSettings,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
    /// Convergence poller.
    poller: Poller,
    /// Auditing comparators.
    verifier: Verifier,
    /// Unique name generator.
    names: NameGenerator,
    /// Current phase.
    phase: ScenarioPhase,
    /// Downstream clusters observed at start.
    downstream: Vec<ClusterId>,
    /// Templates the scenario created and still owns.
    arena: TemplateArena,
    /// Templates the scenario deleted.
    deleted_templates: BTreeSet<RoleTemplateId>,
    /// Live bindings with their creation snapshots.
    snapshots: BTreeMap<BindingName, BindingSnapshot>,
    /// Every principal the scenario bound.
    principals: BTreeSet<Principal>,
    /// Known project namespaces.
    directory: ProjectDirectory,
    /// Heaviest operation class since the last convergence.
    pending: Option<OperationClass>,
    /// Created resources.
    ledger: TeardownLedger,
}

impl<'p, P: PlatformClient + ?Sized> Scenario<'p, P> {
    /// Starts a scenario in the `Setup` phase.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Platform`] when the downstream clusters cannot
    /// be listed.
    pub fn new(
        name: impl Into<String>,
        platform: &'p P,
        settings: ScenarioSettings,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, VerifierError> {
        let downstream = platform.list_downstream_clusters()?;
        let names = NameGenerator::new(settings.name_prefix.clone());
        Ok(Self {
            name: name.into(),
            platform,
            poller: Poller::new(settings.convergence, Arc::clone(&audit)),
            verifier: Verifier::new(Arc::clone(&audit), settings.include_rules),
            settings,
            audit,
            names,
            phase: ScenarioPhase::Setup,
            downstream,
            arena: TemplateArena::new(),
            deleted_templates: BTreeSet::new(),
            snapshots: BTreeMap::new(),
            principals: BTreeSet::new(),
            directory: ProjectDirectory::new(),
            pending: None,
            ledger: TeardownLedger::new(),
        })
    }

    /// Returns the scenario name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current phase.
    #[must_use]
    pub const fn phase(&self) -> ScenarioPhase {
        self.phase
    }

    /// Returns the name generator.
    #[must_use]
    pub const fn names(&self) -> &NameGenerator {
        &self.names
    }

    /// Returns the downstream clusters observed at start.
    #[must_use]
    pub fn downstream(&self) -> &[ClusterId] {
        &self.downstream
    }

    /// Returns the templates the scenario owns.
    #[must_use]
    pub const fn arena(&self) -> &TemplateArena {
        &self.arena
    }

    /// Returns the teardown ledger.
    #[must_use]
    pub const fn ledger(&self) -> &TeardownLedger {
        &self.ledger
    }

    // ------------------------------------------------------------------------
    // Phase handling
    // ------------------------------------------------------------------------

    /// Moves to `to`, emitting an audit event.
    fn transition(&mut self, to: ScenarioPhase) {
        if self.phase == to {
            return;
        }
        self.audit.record(&AuditEvent::ScenarioPhase(ScenarioPhaseEvent::new(
            ScenarioPhaseEventParams {
                scenario: self.name.clone(),
                from: self.phase.as_str(),
                to: to.as_str(),
            },
        )));
        self.phase = to;
    }

    /// Enters `Setup` for a mutation, leaving `Assert` if needed.
    fn begin_mutation(
        &mut self,
        operation: &'static str,
        class: OperationClass,
    ) -> Result<(), VerifierError> {
        match self.phase {
            ScenarioPhase::Setup => {}
            ScenarioPhase::Assert => self.transition(ScenarioPhase::Setup),
            phase => {
                return Err(VerifierError::Phase {
                    operation,
                    phase,
                });
            }
        }
        self.pending = Some(self.pending.map_or(class, |current| current.max(class)));
        Ok(())
    }

    /// Fails unless the scenario is in `Assert`.
    fn require_assert(&self, operation: &'static str) -> Result<(), VerifierError> {
        if self.phase == ScenarioPhase::Assert {
            Ok(())
        } else {
            Err(VerifierError::Phase {
                operation,
                phase: self.phase,
            })
        }
    }

    // ------------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------------

    /// Creates a role template.
    ///
    /// The template is checked by the model first; a cycle, dangling
    /// reference, or malformed grant never reaches the platform.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Model`] when the model rejects the template
    /// and [`VerifierError::Platform`] when creation fails.
    pub fn create_template(
        &mut self,
        template: RoleTemplate,
    ) -> Result<RoleTemplateId, VerifierError> {
        self.begin_mutation("create_template", OperationClass::Read)?;
        template.own_rules().validate()?;
        let id = template.id.clone();
        self.arena.insert(template.clone())?;
        if let Err(err) = Aggregator::new(&self.arena).aggregate(&id) {
            self.arena.remove(&id);
            return Err(err.into());
        }
        if let Err(err) = self.platform.create_role_template(&template) {
            self.arena.remove(&id);
            return Err(err.into());
        }
        self.deleted_templates.remove(&id);
        self.ledger.record(LedgerEntry::Template(id.clone()));
        Ok(id)
    }

    /// Replaces the inheritance list of a template.
    ///
    /// When the policy recomputes local grants the change fans out to every
    /// binding of the template, so the wait uses the binding budget.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Model`] when the change would create a cycle
    /// or a dangling reference, and [`VerifierError::Platform`] when the update
    /// fails.
    pub fn set_inheritance(
        &mut self,
        id: &RoleTemplateId,
        inherited: Vec<RoleTemplateId>,
    ) -> Result<(), VerifierError> {
        let class = if self.settings.policy.inheritance_change
            == InheritanceChangePolicy::RecomputeLocalGrants
        {
            OperationClass::BindingCreate
        } else {
            OperationClass::Read
        };
        self.begin_mutation("set_inheritance", class)?;
        let previous = self.arena.require(id)?.inherited.clone();
        self.arena.replace_inherited(id, inherited)?;
        if let Err(err) = validate_arena(&self.arena) {
            self.arena.replace_inherited(id, previous)?;
            return Err(err.into());
        }
        let updated = self.arena.require(id)?.clone();
        if let Err(err) = self.platform.update_role_template(&updated) {
            self.arena.replace_inherited(id, previous)?;
            return Err(err.into());
        }
        Ok(())
    }

    /// Deletes a role template.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Model`] when another owned template still
    /// inherits it, and [`VerifierError::Platform`] when deletion fails.
    pub fn delete_template(&mut self, id: &RoleTemplateId) -> Result<(), VerifierError> {
        self.begin_mutation("delete_template", OperationClass::Deletion)?;
        self.arena.require(id)?;
        if let Some(dependent) = self.arena.dependents(id).into_iter().next() {
            return Err(ModelError::StillInherited {
                id: id.clone(),
                dependent,
            }
            .into());
        }
        self.platform.delete_role_template(id)?;
        self.arena.remove(id);
        self.deleted_templates.insert(id.clone());
        if self.settings.policy.template_deletion == TemplateDeletionPolicy::CascadeBindings {
            self.snapshots.retain(|_, snapshot| &snapshot.binding.role_template != id);
        }
        Ok(())
    }

    /// Creates a project in a downstream cluster.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Platform`] when creation fails.
    pub fn create_project(
        &mut self,
        cluster: &ClusterId,
        project: &ProjectId,
    ) -> Result<(), VerifierError> {
        self.begin_mutation("create_project", OperationClass::Read)?;
        self.platform.create_project(cluster, project)?;
        self.directory.add_project(cluster.clone(), project.clone());
        self.ledger.record(LedgerEntry::Project {
            cluster: cluster.clone(),
            project: project.clone(),
        });
        Ok(())
    }

    /// Creates a namespace inside a project.
    ///
    /// Project bindings gain a direct grant in the new namespace.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Platform`] when creation fails.
    pub fn create_namespace(
        &mut self,
        cluster: &ClusterId,
        project: &ProjectId,
        namespace: &NamespaceName,
    ) -> Result<(), VerifierError> {
        self.begin_mutation("create_namespace", OperationClass::BindingCreate)?;
        self.platform.create_namespace(cluster, project, namespace)?;
        self.directory.add_namespace(cluster.clone(), project.clone(), namespace.clone());
        self.ledger.record(LedgerEntry::Namespace {
            cluster: cluster.clone(),
            namespace: namespace.clone(),
        });
        Ok(())
    }

    /// Deletes a namespace from a project.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Platform`] when deletion fails.
    pub fn delete_namespace(
        &mut self,
        cluster: &ClusterId,
        project: &ProjectId,
        namespace: &NamespaceName,
    ) -> Result<(), VerifierError> {
        self.begin_mutation("delete_namespace", OperationClass::Deletion)?;
        self.platform.delete_namespace(cluster, namespace)?;
        self.directory.remove_namespace(cluster, project, namespace);
        Ok(())
    }

    /// Creates a binding and records the management kinds it materializes.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Model`] when the bound template cannot be
    /// aggregated and [`VerifierError::Platform`] when creation fails.
    pub fn bind(&mut self, binding: Binding) -> Result<BindingSnapshot, VerifierError> {
        self.begin_mutation("bind", OperationClass::BindingCreate)?;
        let snapshot = self.fanout_model().snapshot(&binding)?;
        self.platform.create_binding(&binding)?;
        self.principals.insert(binding.principal.clone());
        self.ledger.record(LedgerEntry::Binding(binding.name.clone()));
        self.snapshots.insert(binding.name, snapshot.clone());
        Ok(snapshot)
    }

    /// Deletes a binding.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Platform`] when deletion fails.
    pub fn unbind(&mut self, name: &BindingName) -> Result<(), VerifierError> {
        self.begin_mutation("unbind", OperationClass::Deletion)?;
        self.platform.delete_binding(name)?;
        self.snapshots.remove(name);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Convergence
    // ------------------------------------------------------------------------

    /// Polls until the platform matches every prediction, then enters `Assert`.
    ///
    /// The budget is that of the heaviest operation since the last wait.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::ConvergenceTimeout`] when the budget runs out,
    /// [`VerifierError::Model`] when predictions cannot be computed, and
    /// [`VerifierError::Platform`] when a read fails.
    pub fn await_convergence(&mut self) -> Result<PollReport, VerifierError> {
        if self.phase != ScenarioPhase::Setup {
            return Err(VerifierError::Phase {
                operation: "await_convergence",
                phase: self.phase,
            });
        }
        self.transition(ScenarioPhase::AwaitConvergence);
        let class = self.pending.unwrap_or(OperationClass::Read);
        let ((), report) = self.poller.poll(class, &self.name, || self.observe())?;
        self.pending = None;
        self.transition(ScenarioPhase::Assert);
        Ok(report)
    }

    /// Performs one fetch-and-check pass over everything the scenario tracks.
    fn observe(&self) -> Result<Observation<()>, VerifierError> {
        for id in self.tracked_templates() {
            let expected = self.expected_role_objects(&id)?;
            let actual = self.observed_role_objects(&id)?;
            if let Err(mismatch) = compare_role_objects(id.as_str(), &expected, &actual) {
                return Ok(Observation::Pending(mismatch.to_string()));
            }
        }
        for principal in &self.principals {
            let expected = self.expected_bindings(principal);
            let actual = self.observed_bindings(principal)?;
            if let Err(mismatch) = compare_bindings(&principal.to_string(), &expected, &actual) {
                return Ok(Observation::Pending(mismatch.to_string()));
            }
            let expected = self.expected_fanout(principal)?.grants();
            let actual = self.observed_grants(principal)?;
            if let Err(mismatch) = compare_grants(&principal.to_string(), &expected, &actual) {
                return Ok(Observation::Pending(mismatch.to_string()));
            }
        }
        Ok(Observation::Ready(()))
    }

    // ------------------------------------------------------------------------
    // Predictions and observations
    // ------------------------------------------------------------------------

    /// Returns a fan-out model over the owned templates.
    fn fanout_model(&self) -> FanoutModel<'_> {
        FanoutModel::new(
            Projector::new(&self.arena, &self.settings.catalog),
            &self.directory,
            self.settings.policy,
        )
    }

    /// Returns every cluster the scenario inspects.
    fn clusters(&self) -> impl Iterator<Item = ClusterRef> + '_ {
        std::iter::once(ClusterRef::Local)
            .chain(self.downstream.iter().cloned().map(ClusterRef::Downstream))
    }

    /// Returns owned and deleted template ids.
    fn tracked_templates(&self) -> BTreeSet<RoleTemplateId> {
        self.arena
            .iter()
            .map(|template| template.id.clone())
            .chain(self.deleted_templates.iter().cloned())
            .collect()
    }

    /// Returns the role objects the model predicts for a template.
    ///
    /// Deleted templates are predicted to have none.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Model`] when the template cannot be aggregated.
    pub fn expected_role_objects(
        &self,
        id: &RoleTemplateId,
    ) -> Result<Vec<ExpectedRoleObject>, VerifierError> {
        if !self.arena.contains(id) {
            return Ok(Vec::new());
        }
        let mut inventory =
            ObjectInventory::new(Projector::new(&self.arena, &self.settings.catalog));
        Ok(inventory.objects_everywhere(id, &self.downstream)?)
    }

    /// Returns the role objects the platform holds for a template.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Platform`] when a read fails.
    pub fn observed_role_objects(
        &self,
        id: &RoleTemplateId,
    ) -> Result<Vec<RoleObjectRecord>, VerifierError> {
        let selector = ObjectSelector::for_template(id);
        let mut out = Vec::new();
        for cluster in self.clusters() {
            out.extend(self.platform.list_role_objects(&cluster, &selector)?);
        }
        Ok(out)
    }

    /// Returns the bindings a principal should still hold.
    ///
    /// Bindings of a deleted template stay expected unless the deletion
    /// policy cascades them.
    #[must_use]
    pub fn expected_bindings(&self, principal: &Principal) -> Vec<Binding> {
        self.snapshots
            .values()
            .map(|snapshot| &snapshot.binding)
            .filter(|binding| &binding.principal == principal)
            .cloned()
            .collect()
    }

    /// Returns the bindings the platform lists for a principal.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Platform`] when the listing fails.
    pub fn observed_bindings(&self, principal: &Principal) -> Result<Vec<Binding>, VerifierError> {
        Ok(self.platform.list_bindings(&ObjectSelector::for_principal(principal))?)
    }

    /// Returns the grants the model predicts for a principal.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Model`] when a recomputation fails.
    pub fn expected_fanout(&self, principal: &Principal) -> Result<PrincipalFanout, VerifierError> {
        let snapshots: Vec<BindingSnapshot> = self.snapshots.values().cloned().collect();
        Ok(self.fanout_model().principal_fanout(principal, &snapshots)?)
    }

    /// Returns the grants the platform holds for a principal.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Platform`] when a read fails.
    pub fn observed_grants(
        &self,
        principal: &Principal,
    ) -> Result<Vec<GrantRecord>, VerifierError> {
        let selector = ObjectSelector::for_principal(principal);
        let mut out = Vec::new();
        for cluster in self.clusters() {
            out.extend(self.platform.list_grants(&cluster, &selector)?);
        }
        Ok(out)
    }

    /// Returns observed grant counts for a principal.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Platform`] when a read fails.
    pub fn observed_counts(&self, principal: &Principal) -> Result<GrantCounts, VerifierError> {
        let grants = self.observed_grants(principal)?;
        let local = grants.iter().filter(|grant| grant.cluster.is_local()).count();
        Ok(GrantCounts {
            local,
            downstream: grants.len() - local,
        })
    }

    // ------------------------------------------------------------------------
    // Assert
    // ------------------------------------------------------------------------

    /// Verifies the role objects of every tracked template.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Mismatch`] on the first difference.
    pub fn verify_role_objects(&self) -> Result<(), VerifierError> {
        self.require_assert("verify_role_objects")?;
        for id in self.tracked_templates() {
            let expected = self.expected_role_objects(&id)?;
            let actual = self.observed_role_objects(&id)?;
            self.verifier.verify_role_objects(id.as_str(), &expected, &actual)?;
        }
        Ok(())
    }

    /// Verifies the aggregated rules of a template in every cluster.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Mismatch`] when an aggregator's rules differ
    /// from the projection, or when the aggregator is missing.
    pub fn verify_template_rules(&self, id: &RoleTemplateId) -> Result<(), VerifierError> {
        self.require_assert("verify_template_rules")?;
        let mut inventory =
            ObjectInventory::new(Projector::new(&self.arena, &self.settings.catalog));
        let name = role_object_name(id, RoleObjectKind::Aggregator);
        for cluster in self.clusters() {
            let expected: Vec<ExpectedRoleObject> = inventory
                .objects_for(id, &cluster)?
                .into_iter()
                .filter(|object| object.kind == RoleObjectKind::Aggregator)
                .collect();
            let selector = ObjectSelector::new().with_name(name.clone());
            let actual = self.platform.list_role_objects(&cluster, &selector)?;
            let subject = format!("{cluster} {name}");
            match (expected.as_slice(), actual.as_slice()) {
                ([expected], [actual]) => {
                    self.verifier.verify_rules(&subject, &expected.rules, &actual.rules)?;
                }
                _ => self.verifier.verify_role_objects(&subject, &expected, &actual)?,
            }
        }
        Ok(())
    }

    /// Verifies the grants of one principal.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Mismatch`] with both grant lists on any
    /// difference.
    pub fn verify_grants(&self, principal: &Principal) -> Result<(), VerifierError> {
        self.require_assert("verify_grants")?;
        let expected = self.expected_fanout(principal)?.grants();
        let actual = self.observed_grants(principal)?;
        self.verifier.verify_grants(&principal.to_string(), &expected, &actual)?;
        Ok(())
    }

    /// Verifies the bindings the platform lists for a principal.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Mismatch`] with both binding lists on any
    /// difference.
    pub fn verify_bindings(&self, principal: &Principal) -> Result<(), VerifierError> {
        self.require_assert("verify_bindings")?;
        let expected = self.expected_bindings(principal);
        let actual = self.observed_bindings(principal)?;
        self.verifier.verify_bindings(&principal.to_string(), &expected, &actual)?;
        Ok(())
    }

    /// Verifies role objects, aggregated rules, and every principal's
    /// bindings and grants.
    ///
    /// # Errors
    ///
    /// Returns the first [`VerifierError`] met.
    pub fn verify_all(&self) -> Result<(), VerifierError> {
        self.verify_role_objects()?;
        for template in self.arena.iter() {
            self.verify_template_rules(&template.id)?;
        }
        for principal in &self.principals {
            self.verify_bindings(principal)?;
            self.verify_grants(principal)?;
        }
        Ok(())
    }

    /// Probes one operation as `principal` and checks the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::Mismatch`] when the outcome differs and
    /// [`VerifierError::Platform`] when the probe failed for a reason other
    /// than denial.
    pub fn expect_probe(
        &self,
        principal: &Principal,
        request: &ProbeRequest,
        expected: ProbeOutcome,
    ) -> Result<(), VerifierError> {
        self.require_assert("expect_probe")?;
        expect_probe(self.platform, self.audit.as_ref(), principal, request, expected)
    }

    // ------------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------------

    /// Deletes every created resource and finishes the scenario.
    pub fn teardown(&mut self) -> Vec<TeardownFailure> {
        if self.phase == ScenarioPhase::Finished {
            return Vec::new();
        }
        self.transition(ScenarioPhase::Teardown);
        let failures = self.ledger.teardown(self.platform, &self.name, self.audit.as_ref());
        self.transition(ScenarioPhase::Finished);
        failures
    }
}

impl<P: PlatformClient + ?Sized> Drop for Scenario<'_, P> {
    fn drop(&mut self) {
        let _ = self.teardown();
    }
}

impl<P: PlatformClient + ?Sized> fmt::Debug for Scenario<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("downstream", &self.downstream)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Summary of a successful scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    /// Scenario name.
    pub scenario: String,
    /// Resources removed by teardown.
    pub torn_down: usize,
}

/// Runs a scenario body and always tears down afterwards.
///
/// # Errors
///
/// Returns [`ScenarioFailure`] carrying the body's error, or
/// [`VerifierError::Teardown`] when only teardown failed. Teardown failures
/// never replace the body's error.
pub fn run_scenario<P, F>(
    name: &str,
    platform: &P,
    settings: ScenarioSettings,
    audit: Arc<dyn AuditSink>,
    body: F,
) -> Result<ScenarioReport, ScenarioFailure>
where
    P: PlatformClient + ?Sized,
    F: FnOnce(&mut Scenario<'_, P>) -> Result<(), VerifierError>,
{
    let mut scenario =
        Scenario::new(name, platform, settings, audit).map_err(|error| ScenarioFailure {
            scenario: name.to_string(),
            error,
            teardown_failures: Vec::new(),
        })?;
    let outcome = body(&mut scenario);
    let torn_down = scenario.ledger().len();
    let teardown_failures = scenario.teardown();
    match outcome {
        Ok(()) if teardown_failures.is_empty() => Ok(ScenarioReport {
            scenario: name.to_string(),
            torn_down,
        }),
        Ok(()) => Err(ScenarioFailure {
            scenario: name.to_string(),
            error: VerifierError::Teardown {
                count: teardown_failures.len(),
            },
            teardown_failures,
        }),
        Err(error) => Err(ScenarioFailure {
            scenario: name.to_string(),
            error,
            teardown_failures,
        }),
    }
}
