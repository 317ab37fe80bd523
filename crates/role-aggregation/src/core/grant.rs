// crates/role-aggregation/src/core/grant.rs
// ============================================================================
// Module: Permission Grants and Rule Sets
// Description: Order-independent permission grants and canonical rule sets.
// Purpose: Provide the value types every aggregation and comparison builds on.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`PermissionGrant`] is a single verbs x resources x API groups rule. Every
//! field is a set, so two grants are equal exactly when all five fields are
//! set-equal regardless of the order they were written in. A [`RuleSet`] is an
//! unordered collection of grants stored in canonical order: grants are sorted
//! by their canonical field tuple and duplicates collapse on insertion.
//! Canonical order makes element-wise comparison and hashing deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::collections::btree_set;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::ModelError;
use crate::core::error::ModelResult;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Wildcard accepted by verbs, API groups, and resources.
pub const WILDCARD: &str = "*";

// ============================================================================
// SECTION: Permission Grant
// ============================================================================

/// Immutable permission grant with set-valued fields.
///
/// # Invariants
/// - Field order is canonical (`BTreeSet`), so derived equality and ordering
///   are independent of how the grant was written.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    /// Verbs allowed by the grant.
    #[serde(default)]
    pub verbs: BTreeSet<String>,
    /// API groups the grant applies to (`""` is the core group).
    #[serde(default)]
    pub api_groups: BTreeSet<String>,
    /// Resource names (plural kinds) the grant applies to.
    #[serde(default)]
    pub resources: BTreeSet<String>,
    /// Optional object-name restriction.
    #[serde(default)]
    pub resource_names: BTreeSet<String>,
    /// Non-resource URL paths the grant applies to.
    #[serde(default, rename = "nonResourceURLs")]
    pub non_resource_urls: BTreeSet<String>,
}

impl PermissionGrant {
    /// Creates an empty grant to be filled with the `with_*` builders.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds verbs to the grant.
    #[must_use]
    pub fn with_verbs<I, S>(mut self, verbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.verbs.extend(verbs.into_iter().map(Into::into));
        self
    }

    /// Adds API groups to the grant.
    #[must_use]
    pub fn with_api_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.api_groups.extend(groups.into_iter().map(Into::into));
        self
    }

    /// Adds resources to the grant.
    #[must_use]
    pub fn with_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources.extend(resources.into_iter().map(Into::into));
        self
    }

    /// Adds resource-name restrictions to the grant.
    #[must_use]
    pub fn with_resource_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource_names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Adds non-resource URLs to the grant.
    #[must_use]
    pub fn with_non_resource_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.non_resource_urls.extend(urls.into_iter().map(Into::into));
        self
    }

    /// Checks the grant for structural validity.
    ///
    /// A grant needs at least one verb and must target either resources or
    /// non-resource URLs, never both.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MalformedGrant`] when the grant cannot be valid.
    pub fn validate(&self) -> ModelResult<()> {
        if self.verbs.is_empty() {
            return Err(ModelError::MalformedGrant("grant has no verbs".to_string()));
        }
        let targets_resources = !self.resources.is_empty();
        let targets_urls = !self.non_resource_urls.is_empty();
        match (targets_resources, targets_urls) {
            (false, false) => Err(ModelError::MalformedGrant(
                "grant targets neither resources nor non-resource urls".to_string(),
            )),
            (true, true) => Err(ModelError::MalformedGrant(
                "grant mixes resources and non-resource urls".to_string(),
            )),
            (true, false) if self.api_groups.is_empty() => Err(ModelError::MalformedGrant(
                "resource grant has no api groups".to_string(),
            )),
            (false, true) if !self.api_groups.is_empty() || !self.resource_names.is_empty() => {
                Err(ModelError::MalformedGrant(
                    "non-resource url grant carries api groups or resource names".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Returns true when the grant authorizes the given resource request.
    ///
    /// Wildcards are honoured for verbs, API groups, and resources. An empty
    /// resource-name set places no restriction on object names.
    #[must_use]
    pub fn allows(&self, verb: &str, api_group: &str, resource: &str, name: Option<&str>) -> bool {
        if !set_matches(&self.verbs, verb)
            || !set_matches(&self.api_groups, api_group)
            || !set_matches(&self.resources, resource)
        {
            return false;
        }
        if self.resource_names.is_empty() {
            return true;
        }
        name.is_some_and(|name| self.resource_names.contains(name))
    }
}

/// Returns true when the set holds the value or the wildcard.
fn set_matches(set: &BTreeSet<String>, value: &str) -> bool {
    set.contains(value) || set.contains(WILDCARD)
}

// ============================================================================
// SECTION: Rule Set
// ============================================================================

/// Unordered, duplicate-free collection of grants kept in canonical order.
///
/// # Invariants
/// - Iteration order is the canonical grant order.
/// - Structurally equal grants are stored once.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet(BTreeSet<PermissionGrant>);

impl RuleSet {
    /// Creates an empty rule set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Returns the number of distinct grants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when the set holds no grants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Inserts a grant; returns false when an equivalent grant was present.
    pub fn insert(&mut self, grant: PermissionGrant) -> bool {
        self.0.insert(grant)
    }

    /// Returns true when an equivalent grant is present.
    #[must_use]
    pub fn contains(&self, grant: &PermissionGrant) -> bool {
        self.0.contains(grant)
    }

    /// Iterates grants in canonical order.
    pub fn iter(&self) -> btree_set::Iter<'_, PermissionGrant> {
        self.0.iter()
    }

    /// Adds every grant of `other` to this set.
    pub fn union_with(&mut self, other: &Self) {
        self.0.extend(other.0.iter().cloned());
    }

    /// Returns the union of two rule sets.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.union_with(other);
        out
    }

    /// Returns the grants for which `keep` holds.
    #[must_use]
    pub fn filter<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&PermissionGrant) -> bool,
    {
        Self(self.0.iter().filter(|grant| keep(grant)).cloned().collect())
    }

    /// Computes the symmetric difference against an observed rule set.
    ///
    /// `self` is treated as the expectation: `missing` holds grants expected
    /// but not observed, `unexpected` holds grants observed but not expected.
    #[must_use]
    pub fn diff(&self, actual: &Self) -> RuleSetDiff {
        RuleSetDiff {
            missing: Self(self.0.difference(&actual.0).cloned().collect()),
            unexpected: Self(actual.0.difference(&self.0).cloned().collect()),
        }
    }

    /// Validates every grant in the set.
    ///
    /// # Errors
    ///
    /// Returns the first [`ModelError::MalformedGrant`] encountered.
    pub fn validate(&self) -> ModelResult<()> {
        self.0.iter().try_for_each(PermissionGrant::validate)
    }
}

impl FromIterator<PermissionGrant> for RuleSet {
    fn from_iter<I: IntoIterator<Item = PermissionGrant>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<PermissionGrant> for RuleSet {
    fn extend<I: IntoIterator<Item = PermissionGrant>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for RuleSet {
    type Item = PermissionGrant;
    type IntoIter = btree_set::IntoIter<PermissionGrant>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a PermissionGrant;
    type IntoIter = btree_set::Iter<'a, PermissionGrant>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ============================================================================
// SECTION: Rule Set Diff
// ============================================================================

/// Symmetric difference between an expected and an observed rule set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetDiff {
    /// Grants expected but not observed.
    pub missing: RuleSet,
    /// Grants observed but not expected.
    pub unexpected: RuleSet,
}

impl RuleSetDiff {
    /// Returns true when both sides matched exactly.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}
