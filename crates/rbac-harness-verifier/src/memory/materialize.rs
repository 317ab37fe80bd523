// crates/rbac-harness-verifier/src/memory/materialize.rs
// ============================================================================
// Module: Memory Platform Materialization
// Description: Derives role objects and grants from stored desired state.
// Purpose: Reproduce platform materialization with label-selected aggregation.
// Dependencies: role-aggregation, crate::platform
// ============================================================================

//! ## Overview
//! Materialization is recomputed from scratch on every reconcile:
//! - the inheritance closure of each template is an iterative fixed point
//!   over the stored templates, tolerating missing references;
//! - member objects are labelled with an aggregation label for every template
//!   whose closure contains them, and aggregators carry the union of the
//!   members their label selects;
//! - grants are derived from stored bindings, using the management kinds
//!   frozen at binding creation unless the policy recomputes them.
//!
//! None of this calls the model's aggregator, so agreement between the two is
//! a real check.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use role_aggregation::AggregateKind;
use role_aggregation::Binding;
use role_aggregation::BindingName;
use role_aggregation::BindingTarget;
use role_aggregation::ClusterId;
use role_aggregation::ClusterRef;
use role_aggregation::GrantClass;
use role_aggregation::GrantKind;
use role_aggregation::GrantPurpose;
use role_aggregation::InheritanceChangePolicy;
use role_aggregation::ManagementKinds;
use role_aggregation::ManagementResourceCatalog;
use role_aggregation::NamespaceName;
use role_aggregation::ProjectId;
use role_aggregation::RoleObjectKind;
use role_aggregation::RoleScope;
use role_aggregation::RoleTemplate;
use role_aggregation::RoleTemplateId;
use role_aggregation::RuleSet;
use role_aggregation::classify;
use role_aggregation::cluster_namespace;
use role_aggregation::project_namespace;
use role_aggregation::role_object_name;

use crate::platform::GrantRecord;
use crate::platform::LABEL_BINDING;
use crate::platform::LABEL_GRANT_PURPOSE;
use crate::platform::LABEL_OBJECT_KIND;
use crate::platform::LABEL_ROLE_TEMPLATE;
use crate::platform::RoleObjectRecord;

// ============================================================================
// SECTION: Stored State
// ============================================================================

/// Binding as stored by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct StoredBinding {
    /// Binding object.
    pub(super) binding: Binding,
    /// Management kinds observed when the binding was created.
    pub(super) management: ManagementKinds,
}

/// Authored state the platform reconciles from.
#[derive(Debug, Clone, Default)]
pub(super) struct DesiredState {
    /// Downstream clusters.
    pub(super) downstream: BTreeSet<ClusterId>,
    /// Role templates by id.
    pub(super) templates: BTreeMap<RoleTemplateId, RoleTemplate>,
    /// Bindings by name.
    pub(super) bindings: BTreeMap<BindingName, StoredBinding>,
    /// Project namespaces keyed by owning cluster and project.
    pub(super) projects: BTreeMap<(ClusterId, ProjectId), BTreeSet<NamespaceName>>,
}

/// Objects visible to readers.
#[derive(Debug, Clone, Default)]
pub(super) struct MaterializedView {
    /// Role objects per cluster, keyed by name.
    pub(super) role_objects: BTreeMap<ClusterRef, BTreeMap<String, RoleObjectRecord>>,
    /// Grant objects per cluster, keyed by name.
    pub(super) grants: BTreeMap<ClusterRef, BTreeMap<String, GrantRecord>>,
}

// ============================================================================
// SECTION: Labels
// ============================================================================

/// Returns the label an aggregator of `owner` selects for `kind`.
#[must_use]
pub fn aggregation_label(kind: AggregateKind, owner: &RoleTemplateId) -> String {
    format!("{}.aggregate.rbac-harness.io/{owner}", kind.as_str().replace('_', "-"))
}

/// Returns the union of rules of objects carrying `label`.
pub(super) fn select_rules(objects: &BTreeMap<String, RoleObjectRecord>, label: &str) -> RuleSet {
    let mut out = RuleSet::new();
    for object in objects.values().filter(|object| object.labels.contains_key(label)) {
        out.union_with(&object.rules);
    }
    out
}

// ============================================================================
// SECTION: Closure
// ============================================================================

/// Computes every template's inheritance closure (itself included).
///
/// References to missing templates contribute nothing.
pub(super) fn closures(
    templates: &BTreeMap<RoleTemplateId, RoleTemplate>,
) -> BTreeMap<RoleTemplateId, BTreeSet<RoleTemplateId>> {
    let mut reach: BTreeMap<RoleTemplateId, BTreeSet<RoleTemplateId>> =
        templates.keys().map(|id| (id.clone(), BTreeSet::from([id.clone()]))).collect();
    loop {
        let mut changed = false;
        for template in templates.values() {
            let mut gathered = BTreeSet::new();
            for parent in &template.inherited {
                if let Some(parent_reach) = reach.get(parent) {
                    gathered.extend(parent_reach.iter().cloned());
                }
            }
            if let Some(own) = reach.get_mut(&template.id) {
                let before = own.len();
                own.extend(gathered);
                changed |= own.len() != before;
            }
        }
        if !changed {
            return reach;
        }
    }
}

/// Returns the templates whose closure contains each template.
fn dependents(
    reach: &BTreeMap<RoleTemplateId, BTreeSet<RoleTemplateId>>,
) -> BTreeMap<RoleTemplateId, BTreeSet<RoleTemplateId>> {
    let mut out: BTreeMap<RoleTemplateId, BTreeSet<RoleTemplateId>> = BTreeMap::new();
    for (owner, members) in reach {
        for member in members {
            out.entry(member.clone()).or_default().insert(owner.clone());
        }
    }
    out
}

/// Returns the own rules of a stored template.
fn own_rules(template: &RoleTemplate) -> RuleSet {
    if template.external {
        template.rules.union(&template.external_rules)
    } else {
        template.rules.clone()
    }
}

/// Returns the grants of `rules` the platform treats as management for `scope`.
fn platform_management(
    catalog: &ManagementResourceCatalog,
    rules: &RuleSet,
    scope: RoleScope,
) -> RuleSet {
    let class = GrantClass::management_for(scope);
    rules.filter(|grant| classify(catalog, grant, scope) == class)
}

/// Returns the grants of `rules` that are management for neither scope.
fn platform_regular(catalog: &ManagementResourceCatalog, rules: &RuleSet) -> RuleSet {
    rules.filter(|grant| {
        classify(catalog, grant, RoleScope::Cluster) == GrantClass::Regular
            && classify(catalog, grant, RoleScope::Project) == GrantClass::Regular
    })
}

/// Returns which management kinds a template currently reaches.
pub(super) fn management_kinds(
    desired: &DesiredState,
    catalog: &ManagementResourceCatalog,
    id: &RoleTemplateId,
) -> ManagementKinds {
    let reach = closures(&desired.templates);
    let mut union = RuleSet::new();
    for member in reach.get(id).into_iter().flatten() {
        if let Some(template) = desired.templates.get(member) {
            union.union_with(&own_rules(template));
        }
    }
    ManagementKinds {
        cluster: !platform_management(catalog, &union, RoleScope::Cluster).is_empty(),
        project: !platform_management(catalog, &union, RoleScope::Project).is_empty(),
    }
}

// ============================================================================
// SECTION: Role Objects
// ============================================================================

/// Builds a role object record.
fn role_object(
    cluster: &ClusterRef,
    owner: &RoleTemplateId,
    kind: RoleObjectKind,
    mut labels: BTreeMap<String, String>,
    rules: RuleSet,
) -> RoleObjectRecord {
    labels.insert(LABEL_ROLE_TEMPLATE.to_string(), owner.to_string());
    labels.insert(LABEL_OBJECT_KIND.to_string(), kind.as_str().to_string());
    RoleObjectRecord {
        cluster: cluster.clone(),
        name: role_object_name(owner, kind),
        labels,
        rules,
    }
}

/// Returns membership labels for the member object of `owner`.
fn membership_labels(
    kind: AggregateKind,
    owner: &RoleTemplateId,
    dependents: &BTreeMap<RoleTemplateId, BTreeSet<RoleTemplateId>>,
) -> BTreeMap<String, String> {
    dependents
        .get(owner)
        .into_iter()
        .flatten()
        .map(|selector| (aggregation_label(kind, selector), "true".to_string()))
        .collect()
}

/// Materializes role objects for one cluster.
fn materialize_cluster(
    desired: &DesiredState,
    catalog: &ManagementResourceCatalog,
    dependents: &BTreeMap<RoleTemplateId, BTreeSet<RoleTemplateId>>,
    cluster: &ClusterRef,
) -> BTreeMap<String, RoleObjectRecord> {
    let mut members = BTreeMap::new();
    for template in desired.templates.values() {
        let own = own_rules(template);
        if cluster.is_local() {
            let labels = membership_labels(AggregateKind::Main, &template.id, dependents);
            let object =
                role_object(cluster, &template.id, RoleObjectKind::Own, labels, own.clone());
            members.insert(object.name.clone(), object);
            for scope in [RoleScope::Cluster, RoleScope::Project] {
                let subset = platform_management(catalog, &own, scope);
                if subset.is_empty() {
                    continue;
                }
                let kind = RoleObjectKind::management_member(scope);
                let labels = membership_labels(kind.aggregate_kind(), &template.id, dependents);
                let object = role_object(cluster, &template.id, kind, labels, subset);
                members.insert(object.name.clone(), object);
            }
        } else {
            let labels = membership_labels(AggregateKind::Main, &template.id, dependents);
            let rules = platform_regular(catalog, &own);
            let object = role_object(cluster, &template.id, RoleObjectKind::Own, labels, rules);
            members.insert(object.name.clone(), object);
        }
    }

    let mut aggregators = Vec::new();
    for template in desired.templates.values() {
        let main = select_rules(&members, &aggregation_label(AggregateKind::Main, &template.id));
        aggregators.push(role_object(
            cluster,
            &template.id,
            RoleObjectKind::Aggregator,
            BTreeMap::new(),
            main,
        ));
        if !cluster.is_local() {
            continue;
        }
        for scope in [RoleScope::Cluster, RoleScope::Project] {
            let member_name =
                role_object_name(&template.id, RoleObjectKind::management_member(scope));
            if !members.contains_key(&member_name) {
                continue;
            }
            let kind = RoleObjectKind::management_aggregator(scope);
            let label = aggregation_label(kind.aggregate_kind(), &template.id);
            let rules = select_rules(&members, &label);
            aggregators.push(role_object(cluster, &template.id, kind, BTreeMap::new(), rules));
        }
    }
    for object in aggregators {
        members.insert(object.name.clone(), object);
    }
    members
}

// ============================================================================
// SECTION: Grants
// ============================================================================

/// Materializes grant objects for every stored binding.
fn materialize_grants(
    desired: &DesiredState,
    catalog: &ManagementResourceCatalog,
    inheritance_change: InheritanceChangePolicy,
) -> BTreeMap<ClusterRef, BTreeMap<String, GrantRecord>> {
    let mut out: BTreeMap<ClusterRef, BTreeMap<String, GrantRecord>> = BTreeMap::new();
    for stored in desired.bindings.values() {
        let binding = &stored.binding;
        let template_exists = desired.templates.contains_key(&binding.role_template);
        let management = match inheritance_change {
            InheritanceChangePolicy::RecomputeLocalGrants if template_exists => {
                management_kinds(desired, catalog, &binding.role_template)
            }
            _ => stored.management,
        };
        let grant = |cluster: ClusterRef,
                     kind: GrantKind,
                     namespace: Option<NamespaceName>,
                     role_name: String,
                     purpose: GrantPurpose| {
            let suffix = namespace.as_ref().map_or_else(String::new, |ns| format!("-{ns}"));
            let labels = BTreeMap::from([
                (LABEL_ROLE_TEMPLATE.to_string(), binding.role_template.to_string()),
                (LABEL_BINDING.to_string(), binding.name.to_string()),
                (LABEL_GRANT_PURPOSE.to_string(), purpose.as_str().to_string()),
            ]);
            GrantRecord {
                cluster,
                kind,
                name: format!("{}-{}{suffix}", binding.name, purpose.as_str().replace('_', "-")),
                namespace,
                role_name,
                principal: binding.principal.clone(),
                labels,
            }
        };
        let direct_role = role_object_name(&binding.role_template, RoleObjectKind::Aggregator);
        let mut records = Vec::new();
        let backing = match &binding.target {
            BindingTarget::Cluster {
                cluster,
            } => {
                records.push(grant(
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
                let key = (cluster.clone(), project.clone());
                for namespace in desired.projects.get(&key).into_iter().flatten() {
                    records.push(grant(
                        ClusterRef::Downstream(cluster.clone()),
                        GrantKind::RoleBinding,
                        Some(namespace.clone()),
                        direct_role.clone(),
                        GrantPurpose::Direct,
                    ));
                }
                project_namespace(cluster, project)
            }
        };
        for scope in [RoleScope::Cluster, RoleScope::Project] {
            if management.touches(scope) {
                let kind = RoleObjectKind::management_aggregator(scope);
                records.push(grant(
                    ClusterRef::Local,
                    GrantKind::RoleBinding,
                    Some(backing.clone()),
                    role_object_name(&binding.role_template, kind),
                    GrantPurpose::management_for(scope),
                ));
            }
        }
        for record in records {
            out.entry(record.cluster.clone()).or_default().insert(record.name.clone(), record);
        }
    }
    out
}

// ============================================================================
// SECTION: Reconcile
// ============================================================================

/// Recomputes every derived object from the desired state.
pub(super) fn materialize(
    desired: &DesiredState,
    catalog: &ManagementResourceCatalog,
    inheritance_change: InheritanceChangePolicy,
) -> MaterializedView {
    let reach = closures(&desired.templates);
    let dependents = dependents(&reach);
    let clusters = std::iter::once(ClusterRef::Local)
        .chain(desired.downstream.iter().cloned().map(ClusterRef::Downstream));
    let role_objects = clusters
        .map(|cluster| {
            let objects = materialize_cluster(desired, catalog, &dependents, &cluster);
            (cluster, objects)
        })
        .collect();
    MaterializedView {
        role_objects,
        grants: materialize_grants(desired, catalog, inheritance_change),
    }
}
