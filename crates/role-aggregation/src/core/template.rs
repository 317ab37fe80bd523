// crates/role-aggregation/src/core/template.rs
// ============================================================================
// Module: Role Templates and the Template Arena
// Description: DAG nodes carrying rule sets and inherited template references.
// Purpose: Hold every template a scenario created behind an explicit arena.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`RoleTemplate`] owns a rule set and an ordered list of inherited
//! templates. Templates form a DAG; shared ancestors are legal and cycles are
//! not. The [`TemplateArena`] indexes templates by id so traversal never
//! re-fetches or re-derives a node, and so callers hand the model exactly the
//! templates they created instead of consulting a global registry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::btree_map;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::ModelError;
use crate::core::error::ModelResult;
use crate::core::grant::PermissionGrant;
use crate::core::grant::RuleSet;
use crate::core::identifiers::RoleTemplateId;

// ============================================================================
// SECTION: Scope
// ============================================================================

/// Scope a template, binding, or classification applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleScope {
    /// Cluster-wide scope.
    Cluster,
    /// Project scope (a group of namespaces).
    Project,
}

impl RoleScope {
    /// Returns a stable label for the scope.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cluster => "cluster",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for RoleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Role Template
// ============================================================================

/// Named, reusable bundle of grants that may inherit other templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleTemplate {
    /// Template identifier.
    pub id: RoleTemplateId,
    /// Scope the template is meant to be bound in.
    pub scope: RoleScope,
    /// Rules authored directly on the template.
    #[serde(default)]
    pub rules: RuleSet,
    /// Inherited templates, in declaration order.
    #[serde(default)]
    pub inherited: Vec<RoleTemplateId>,
    /// Whether the template is backed by an externally managed role.
    #[serde(default)]
    pub external: bool,
    /// Rules of the external role; only used when `external` is set.
    #[serde(default)]
    pub external_rules: RuleSet,
}

impl RoleTemplate {
    /// Creates an empty template with no rules and no inheritance.
    #[must_use]
    pub fn new(id: impl Into<RoleTemplateId>, scope: RoleScope) -> Self {
        Self {
            id: id.into(),
            scope,
            rules: RuleSet::new(),
            inherited: Vec::new(),
            external: false,
            external_rules: RuleSet::new(),
        }
    }

    /// Adds an authored grant.
    #[must_use]
    pub fn with_rule(mut self, grant: PermissionGrant) -> Self {
        self.rules.insert(grant);
        self
    }

    /// Appends an inherited template reference.
    #[must_use]
    pub fn inheriting(mut self, parent: impl Into<RoleTemplateId>) -> Self {
        self.inherited.push(parent.into());
        self
    }

    /// Marks the template external and attaches the external role's rules.
    #[must_use]
    pub fn with_external_rules(mut self, rules: RuleSet) -> Self {
        self.external = true;
        self.external_rules = rules;
        self
    }

    /// Returns the rules this node contributes on its own.
    ///
    /// External rules are included only for external templates.
    #[must_use]
    pub fn own_rules(&self) -> RuleSet {
        if self.external { self.rules.union(&self.external_rules) } else { self.rules.clone() }
    }
}

// ============================================================================
// SECTION: Template Arena
// ============================================================================

/// Arena of templates indexed by id.
///
/// # Invariants
/// - Ids are unique.
/// - References to templates outside the arena are reported at traversal time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateArena {
    /// Templates keyed by id.
    templates: BTreeMap<RoleTemplateId, RoleTemplate>,
}

impl TemplateArena {
    /// Creates an empty arena.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            templates: BTreeMap::new(),
        }
    }

    /// Builds an arena from a list of templates.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateTemplate`] when two templates share an id.
    pub fn from_templates<I>(templates: I) -> ModelResult<Self>
    where
        I: IntoIterator<Item = RoleTemplate>,
    {
        let mut arena = Self::new();
        for template in templates {
            arena.insert(template)?;
        }
        Ok(arena)
    }

    /// Registers a new template.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateTemplate`] when the id is taken.
    pub fn insert(&mut self, template: RoleTemplate) -> ModelResult<()> {
        match self.templates.entry(template.id.clone()) {
            btree_map::Entry::Occupied(_) => Err(ModelError::DuplicateTemplate(template.id)),
            btree_map::Entry::Vacant(slot) => {
                slot.insert(template);
                Ok(())
            }
        }
    }

    /// Replaces the inheritance list of a template wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownTemplate`] when the template is absent.
    pub fn replace_inherited(
        &mut self,
        id: &RoleTemplateId,
        inherited: Vec<RoleTemplateId>,
    ) -> ModelResult<()> {
        let template = self.templates.get_mut(id).ok_or_else(|| ModelError::UnknownTemplate {
            id: id.clone(),
            referenced_by: None,
        })?;
        template.inherited = inherited;
        Ok(())
    }

    /// Removes a template and returns it when present.
    pub fn remove(&mut self, id: &RoleTemplateId) -> Option<RoleTemplate> {
        self.templates.remove(id)
    }

    /// Looks up a template by id.
    #[must_use]
    pub fn get(&self, id: &RoleTemplateId) -> Option<&RoleTemplate> {
        self.templates.get(id)
    }

    /// Looks up a template, failing on absence.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownTemplate`] when the template is absent.
    pub fn require(&self, id: &RoleTemplateId) -> ModelResult<&RoleTemplate> {
        self.get(id).ok_or_else(|| ModelError::UnknownTemplate {
            id: id.clone(),
            referenced_by: None,
        })
    }

    /// Returns true when the arena holds the id.
    #[must_use]
    pub fn contains(&self, id: &RoleTemplateId) -> bool {
        self.templates.contains_key(id)
    }

    /// Returns the number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns true when the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Iterates templates in id order.
    pub fn iter(&self) -> btree_map::Values<'_, RoleTemplateId, RoleTemplate> {
        self.templates.values()
    }

    /// Returns the ids of templates that directly inherit `id`.
    #[must_use]
    pub fn dependents(&self, id: &RoleTemplateId) -> BTreeSet<RoleTemplateId> {
        self.templates
            .values()
            .filter(|template| template.inherited.contains(id))
            .map(|template| template.id.clone())
            .collect()
    }

    /// Checks that every inherited reference resolves inside the arena.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownTemplate`] naming the first dangling reference.
    pub fn validate_references(&self) -> ModelResult<()> {
        for template in self.templates.values() {
            for parent in &template.inherited {
                if !self.templates.contains_key(parent) {
                    return Err(ModelError::UnknownTemplate {
                        id: parent.clone(),
                        referenced_by: Some(template.id.clone()),
                    });
                }
            }
        }
        Ok(())
    }
}
