// crates/rbac-harness-verifier/src/memory/authz.rs
// ============================================================================
// Module: Memory Platform Authorization
// Description: Evaluates permission probes against materialized grants.
// Purpose: Decide allow or deny the way the platform's authorizer would.
// Dependencies: role-aggregation, crate::platform
// ============================================================================

//! ## Overview
//! A probe is allowed when any grant held by the principal in the target
//! cluster references a role whose rules allow the request. Role bindings
//! only authorize requests inside their own namespace. A referenced
//! management aggregator that has no object of its own is resolved by label
//! selection over its members.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use role_aggregation::GrantKind;
use role_aggregation::Principal;
use role_aggregation::RoleObjectKind;
use role_aggregation::RoleScope;
use role_aggregation::RoleTemplateId;
use role_aggregation::RuleSet;
use role_aggregation::role_object_name;

use super::materialize::MaterializedView;
use super::materialize::aggregation_label;
use super::materialize::select_rules;
use crate::platform::GrantRecord;
use crate::platform::LABEL_ROLE_TEMPLATE;
use crate::platform::PlatformError;
use crate::platform::ProbeRequest;
use crate::platform::RoleObjectRecord;

// ============================================================================
// SECTION: Authorization
// ============================================================================

/// Authorizes one probe against the materialized view.
pub(super) fn authorize(
    view: &MaterializedView,
    principal: &Principal,
    request: &ProbeRequest,
) -> Result<(), PlatformError> {
    let Some(objects) = view.role_objects.get(&request.cluster) else {
        return Err(PlatformError::NotFound {
            kind: "cluster",
            name: request.cluster.to_string(),
        });
    };
    let empty = BTreeMap::new();
    let grants = view.grants.get(&request.cluster).unwrap_or(&empty);
    let allowed = grants
        .values()
        .filter(|grant| &grant.principal == principal)
        .filter(|grant| applies_to(grant, request))
        .filter_map(|grant| resolve_role(objects, grant))
        .any(|rules| {
            rules.iter().any(|rule| {
                rule.allows(
                    request.verb.as_str(),
                    &request.api_group,
                    &request.resource,
                    request.name.as_deref(),
                )
            })
        });
    if allowed {
        Ok(())
    } else {
        Err(PlatformError::Forbidden(format!("{principal} cannot {request}")))
    }
}

/// Returns true when the grant's scope covers the request.
fn applies_to(grant: &GrantRecord, request: &ProbeRequest) -> bool {
    match grant.kind {
        GrantKind::ClusterRoleBinding => true,
        GrantKind::RoleBinding => {
            grant.namespace.is_some() && grant.namespace == request.namespace
        }
    }
}

/// Resolves the rules of the role a grant references.
fn resolve_role(
    objects: &BTreeMap<String, RoleObjectRecord>,
    grant: &GrantRecord,
) -> Option<RuleSet> {
    if let Some(object) = objects.get(&grant.role_name) {
        return Some(object.rules.clone());
    }
    let owner = RoleTemplateId::new(grant.labels.get(LABEL_ROLE_TEMPLATE)?.as_str());
    [RoleScope::Cluster, RoleScope::Project].into_iter().find_map(|scope| {
        let kind = RoleObjectKind::management_aggregator(scope);
        let name = role_object_name(&owner, kind);
        (name == grant.role_name)
            .then(|| select_rules(objects, &aggregation_label(kind.aggregate_kind(), &owner)))
    })
}
