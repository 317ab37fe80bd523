// crates/rbac-harness-verifier/src/compare.rs
// ============================================================================
// Module: Verification Comparators
// Description: Expected-versus-actual comparison of rules, roles, grants,
//              and binding objects.
// Purpose: Report structural differences with both sides in full.
// Dependencies: role-aggregation, serde, serde_json, crate::{audit, platform}
// ============================================================================

//! ## Overview
//! Rule sets are compared element-wise after canonicalization and report the
//! symmetric difference. Role objects, grants, and bindings are reduced to
//! descriptors
//! and compared first by count, then as multisets; either failure reports the
//! complete expected and actual lists, never just the counts.
//!
//! [`Verifier`] wraps the comparators and emits one audit event per check
//! with canonical hashes of both sides.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use role_aggregation::Binding;
use role_aggregation::BindingName;
use role_aggregation::BindingTarget;
use role_aggregation::ClusterRef;
use role_aggregation::ExpectedGrant;
use role_aggregation::ExpectedRoleObject;
use role_aggregation::GrantKind;
use role_aggregation::NamespaceName;
use role_aggregation::Principal;
use role_aggregation::RoleTemplateId;
use role_aggregation::RuleDigest;
use role_aggregation::RuleSet;
use role_aggregation::RuleSetDiff;
use serde::Serialize;

use crate::audit::AuditEvent;
use crate::audit::AuditSink;
use crate::audit::VerificationEvent;
use crate::audit::VerificationEventParams;
use crate::platform::GrantRecord;
use crate::platform::ProbeRequest;
use crate::platform::RoleObjectRecord;
use crate::probe::ProbeOutcome;

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Comparable identity and content of a role object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ObjectDescriptor {
    /// Cluster holding the object.
    pub cluster: ClusterRef,
    /// Object name.
    pub name: String,
    /// Object rules.
    pub rules: RuleSet,
}

impl From<&ExpectedRoleObject> for ObjectDescriptor {
    fn from(object: &ExpectedRoleObject) -> Self {
        Self {
            cluster: object.cluster.clone(),
            name: object.name.clone(),
            rules: object.rules.clone(),
        }
    }
}

impl From<&RoleObjectRecord> for ObjectDescriptor {
    fn from(record: &RoleObjectRecord) -> Self {
        Self {
            cluster: record.cluster.clone(),
            name: record.name.clone(),
            rules: record.rules.clone(),
        }
    }
}

impl fmt::Display for ObjectDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.cluster, self.name, render_json(&self.rules))
    }
}

/// Comparable identity of a grant object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct GrantDescriptor {
    /// Cluster holding the grant.
    pub cluster: ClusterRef,
    /// Grant object kind.
    pub kind: GrantKind,
    /// Namespace for role bindings.
    pub namespace: Option<NamespaceName>,
    /// Referenced role object name.
    pub role_name: String,
    /// Principal receiving the grant.
    pub principal: Principal,
}

impl From<&ExpectedGrant> for GrantDescriptor {
    fn from(grant: &ExpectedGrant) -> Self {
        Self {
            cluster: grant.cluster.clone(),
            kind: grant.kind,
            namespace: grant.namespace.clone(),
            role_name: grant.role_name.clone(),
            principal: grant.principal.clone(),
        }
    }
}

impl From<&GrantRecord> for GrantDescriptor {
    fn from(record: &GrantRecord) -> Self {
        Self {
            cluster: record.cluster.clone(),
            kind: record.kind,
            namespace: record.namespace.clone(),
            role_name: record.role_name.clone(),
            principal: record.principal.clone(),
        }
    }
}

impl fmt::Display for GrantDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ", self.cluster, self.kind)?;
        if let Some(namespace) = &self.namespace {
            write!(f, "{namespace}/")?;
        }
        write!(f, "{} for {}", self.role_name, self.principal)
    }
}

/// Comparable identity of a binding object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct BindingDescriptor {
    /// Binding object name.
    pub name: BindingName,
    /// Bound role template.
    pub role_template: RoleTemplateId,
    /// Principal receiving the permissions.
    pub principal: Principal,
    /// Cluster or project the binding applies to.
    pub target: BindingTarget,
}

impl From<&Binding> for BindingDescriptor {
    fn from(binding: &Binding) -> Self {
        Self {
            name: binding.name.clone(),
            role_template: binding.role_template.clone(),
            principal: binding.principal.clone(),
            target: binding.target.clone(),
        }
    }
}

impl fmt::Display for BindingDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} binds {} to {} on {}",
            self.name, self.role_template, self.principal, self.target
        )
    }
}

// ============================================================================
// SECTION: Mismatch Reports
// ============================================================================

/// Kind of verification check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Aggregated rule set comparison.
    Rules,
    /// Materialized role object comparison.
    RoleObjects,
    /// Grant fan-out comparison.
    Grants,
    /// Binding object comparison.
    Bindings,
    /// Permission probe expectation.
    Probe,
}

impl CheckKind {
    /// Returns a stable label for the check.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rules => "rules",
            Self::RoleObjects => "role_objects",
            Self::Grants => "grants",
            Self::Bindings => "bindings",
            Self::Probe => "probe",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full content of a verification mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MismatchDetails {
    /// Rule sets differ.
    Rules {
        /// Expected rules.
        expected: RuleSet,
        /// Actual rules.
        actual: RuleSet,
        /// Symmetric difference.
        diff: RuleSetDiff,
    },
    /// Role objects differ.
    RoleObjects {
        /// Expected objects.
        expected: Vec<ObjectDescriptor>,
        /// Actual objects.
        actual: Vec<ObjectDescriptor>,
        /// Expected but not observed.
        missing: Vec<ObjectDescriptor>,
        /// Observed but not expected.
        unexpected: Vec<ObjectDescriptor>,
    },
    /// Grants differ.
    Grants {
        /// Expected grants.
        expected: Vec<GrantDescriptor>,
        /// Actual grants.
        actual: Vec<GrantDescriptor>,
        /// Expected but not observed.
        missing: Vec<GrantDescriptor>,
        /// Observed but not expected.
        unexpected: Vec<GrantDescriptor>,
    },
    /// Binding objects differ.
    Bindings {
        /// Expected bindings.
        expected: Vec<BindingDescriptor>,
        /// Actual bindings.
        actual: Vec<BindingDescriptor>,
        /// Expected but not observed.
        missing: Vec<BindingDescriptor>,
        /// Observed but not expected.
        unexpected: Vec<BindingDescriptor>,
    },
    /// A probe returned the other outcome.
    Probe {
        /// Impersonated principal.
        principal: Principal,
        /// Probed operation.
        request: ProbeRequest,
        /// Expected outcome.
        expected: ProbeOutcome,
        /// Observed outcome.
        observed: ProbeOutcome,
    },
}

/// Structural difference between expected and actual state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationMismatch {
    /// Check that failed.
    pub check: CheckKind,
    /// What was checked.
    pub subject: String,
    /// Both sides of the comparison.
    pub details: MismatchDetails,
}

impl fmt::Display for VerificationMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mismatch for {}", self.check, self.subject)?;
        match &self.details {
            MismatchDetails::Rules {
                expected,
                actual,
                diff,
            } => {
                write!(f, "\n  expected: {}", render_json(expected))?;
                write!(f, "\n  actual:   {}", render_json(actual))?;
                write!(f, "\n  missing:  {}", render_json(&diff.missing))?;
                write!(f, "\n  unexpected: {}", render_json(&diff.unexpected))
            }
            MismatchDetails::RoleObjects {
                expected,
                actual,
                missing,
                unexpected,
            } => write_lists(f, expected, actual, missing, unexpected),
            MismatchDetails::Grants {
                expected,
                actual,
                missing,
                unexpected,
            } => write_lists(f, expected, actual, missing, unexpected),
            MismatchDetails::Bindings {
                expected,
                actual,
                missing,
                unexpected,
            } => write_lists(f, expected, actual, missing, unexpected),
            MismatchDetails::Probe {
                principal,
                request,
                expected,
                observed,
            } => write!(
                f,
                "\n  {principal} {request}: expected {expected}, observed {observed}"
            ),
        }
    }
}

impl std::error::Error for VerificationMismatch {}

/// Writes expected, actual, missing, and unexpected lists.
fn write_lists<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    expected: &[T],
    actual: &[T],
    missing: &[T],
    unexpected: &[T],
) -> fmt::Result {
    for (label, items) in
        [
            ("expected", expected),
            ("actual", actual),
            ("missing", missing),
            ("unexpected", unexpected),
        ]
    {
        write!(f, "\n  {label} ({}):", items.len())?;
        for item in items {
            write!(f, "\n    {item}")?;
        }
    }
    Ok(())
}

/// Renders a value as compact JSON for reports.
fn render_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "<unserializable>".to_string())
}

// ============================================================================
// SECTION: Comparators
// ============================================================================

/// Returns the multiset differences `(expected - actual, actual - expected)`.
fn multiset_diff<T: Ord + Clone>(expected: &[T], actual: &[T]) -> (Vec<T>, Vec<T>) {
    let mut balance: BTreeMap<&T, i64> = BTreeMap::new();
    for item in expected {
        *balance.entry(item).or_default() += 1;
    }
    for item in actual {
        *balance.entry(item).or_default() -= 1;
    }
    let mut missing = Vec::new();
    let mut unexpected = Vec::new();
    for (item, count) in balance {
        let copies = usize::try_from(count.unsigned_abs()).unwrap_or(usize::MAX);
        let target = if count > 0 { &mut missing } else { &mut unexpected };
        target.extend(std::iter::repeat_n(item.clone(), copies));
    }
    (missing, unexpected)
}

/// Compares two canonical rule sets.
///
/// # Errors
///
/// Returns [`VerificationMismatch`] with the symmetric difference when the
/// sets differ.
pub fn compare_rules(
    subject: &str,
    expected: &RuleSet,
    actual: &RuleSet,
) -> Result<(), VerificationMismatch> {
    let diff = expected.diff(actual);
    if diff.is_empty() {
        return Ok(());
    }
    Err(VerificationMismatch {
        check: CheckKind::Rules,
        subject: subject.to_string(),
        details: MismatchDetails::Rules {
            expected: expected.clone(),
            actual: actual.clone(),
            diff,
        },
    })
}

/// Compares expected role objects with observed records.
///
/// # Errors
///
/// Returns [`VerificationMismatch`] with both full lists when the counts or
/// the contents differ.
pub fn compare_role_objects(
    subject: &str,
    expected: &[ExpectedRoleObject],
    actual: &[RoleObjectRecord],
) -> Result<(), VerificationMismatch> {
    let expected = sorted(expected.iter().map(ObjectDescriptor::from));
    let actual = sorted(actual.iter().map(ObjectDescriptor::from));
    let (missing, unexpected) = multiset_diff(&expected, &actual);
    if expected.len() == actual.len() && missing.is_empty() && unexpected.is_empty() {
        return Ok(());
    }
    Err(VerificationMismatch {
        check: CheckKind::RoleObjects,
        subject: subject.to_string(),
        details: MismatchDetails::RoleObjects {
            expected,
            actual,
            missing,
            unexpected,
        },
    })
}

/// Compares expected grants with observed grant records.
///
/// # Errors
///
/// Returns [`VerificationMismatch`] with both full lists when the counts or
/// the contents differ.
pub fn compare_grants(
    subject: &str,
    expected: &[ExpectedGrant],
    actual: &[GrantRecord],
) -> Result<(), VerificationMismatch> {
    let expected = sorted(expected.iter().map(GrantDescriptor::from));
    let actual = sorted(actual.iter().map(GrantDescriptor::from));
    let (missing, unexpected) = multiset_diff(&expected, &actual);
    if expected.len() == actual.len() && missing.is_empty() && unexpected.is_empty() {
        return Ok(());
    }
    Err(VerificationMismatch {
        check: CheckKind::Grants,
        subject: subject.to_string(),
        details: MismatchDetails::Grants {
            expected,
            actual,
            missing,
            unexpected,
        },
    })
}

/// Compares the bindings a scenario still holds with listed bindings.
///
/// # Errors
///
/// Returns [`VerificationMismatch`] with both full lists when the counts or
/// the contents differ.
pub fn compare_bindings(
    subject: &str,
    expected: &[Binding],
    actual: &[Binding],
) -> Result<(), VerificationMismatch> {
    let expected = sorted(expected.iter().map(BindingDescriptor::from));
    let actual = sorted(actual.iter().map(BindingDescriptor::from));
    let (missing, unexpected) = multiset_diff(&expected, &actual);
    if expected.len() == actual.len() && missing.is_empty() && unexpected.is_empty() {
        return Ok(());
    }
    Err(VerificationMismatch {
        check: CheckKind::Bindings,
        subject: subject.to_string(),
        details: MismatchDetails::Bindings {
            expected,
            actual,
            missing,
            unexpected,
        },
    })
}

/// Collects and sorts descriptors.
fn sorted<T: Ord>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut out: Vec<T> = items.collect();
    out.sort();
    out
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Comparators that audit every check.
#[derive(Clone)]
pub struct Verifier {
    /// Audit sink for verification events.
    audit: Arc<dyn AuditSink>,
    /// Attach raw content to audit events.
    include_rules: bool,
}

impl Verifier {
    /// Creates a verifier.
    #[must_use]
    pub fn new(audit: Arc<dyn AuditSink>, include_rules: bool) -> Self {
        Self {
            audit,
            include_rules,
        }
    }

    /// Verifies a rule set.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationMismatch`] when the sets differ.
    pub fn verify_rules(
        &self,
        subject: &str,
        expected: &RuleSet,
        actual: &RuleSet,
    ) -> Result<(), VerificationMismatch> {
        let result = compare_rules(subject, expected, actual);
        self.record(
            CheckKind::Rules,
            subject,
            (expected.len(), expected),
            (actual.len(), actual),
            &result,
        );
        result
    }

    /// Verifies materialized role objects.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationMismatch`] when the objects differ.
    pub fn verify_role_objects(
        &self,
        subject: &str,
        expected: &[ExpectedRoleObject],
        actual: &[RoleObjectRecord],
    ) -> Result<(), VerificationMismatch> {
        let result = compare_role_objects(subject, expected, actual);
        let expected_items = sorted(expected.iter().map(ObjectDescriptor::from));
        let actual_items = sorted(actual.iter().map(ObjectDescriptor::from));
        self.record(
            CheckKind::RoleObjects,
            subject,
            (expected_items.len(), &expected_items),
            (actual_items.len(), &actual_items),
            &result,
        );
        result
    }

    /// Verifies grant fan-out.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationMismatch`] when the grants differ.
    pub fn verify_grants(
        &self,
        subject: &str,
        expected: &[ExpectedGrant],
        actual: &[GrantRecord],
    ) -> Result<(), VerificationMismatch> {
        let result = compare_grants(subject, expected, actual);
        let expected_items = sorted(expected.iter().map(GrantDescriptor::from));
        let actual_items = sorted(actual.iter().map(GrantDescriptor::from));
        self.record(
            CheckKind::Grants,
            subject,
            (expected_items.len(), &expected_items),
            (actual_items.len(), &actual_items),
            &result,
        );
        result
    }

    /// Verifies listed binding objects.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationMismatch`] when the bindings differ.
    pub fn verify_bindings(
        &self,
        subject: &str,
        expected: &[Binding],
        actual: &[Binding],
    ) -> Result<(), VerificationMismatch> {
        let result = compare_bindings(subject, expected, actual);
        let expected_items = sorted(expected.iter().map(BindingDescriptor::from));
        let actual_items = sorted(actual.iter().map(BindingDescriptor::from));
        self.record(
            CheckKind::Bindings,
            subject,
            (expected_items.len(), &expected_items),
            (actual_items.len(), &actual_items),
            &result,
        );
        result
    }

    /// Emits a verification audit event.
    fn record<E: Serialize + ?Sized, A: Serialize + ?Sized>(
        &self,
        check: CheckKind,
        subject: &str,
        expected: (usize, &E),
        actual: (usize, &A),
        result: &Result<(), VerificationMismatch>,
    ) {
        let (expected_raw, actual_raw) = if self.include_rules {
            (serde_json::to_value(expected.1).ok(), serde_json::to_value(actual.1).ok())
        } else {
            (None, None)
        };
        let event = VerificationEvent::new(VerificationEventParams {
            check: check.as_str(),
            subject: subject.to_string(),
            outcome: if result.is_ok() { "ok" } else { "mismatch" },
            expected_count: expected.0,
            actual_count: actual.0,
            expected_hash: RuleDigest::of(expected.1).ok(),
            actual_hash: RuleDigest::of(actual.1).ok(),
            expected: expected_raw,
            actual: actual_raw,
        });
        self.audit.record(&AuditEvent::Verification(event));
    }
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("include_rules", &self.include_rules)
            .finish_non_exhaustive()
    }
}
