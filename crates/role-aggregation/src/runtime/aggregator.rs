// crates/role-aggregation/src/runtime/aggregator.rs
// ============================================================================
// Module: Inheritance Aggregator
// Description: Memoized depth-first union of rules over the inheritance DAG.
// Purpose: Compute the main aggregated rule set of a role template.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The aggregator walks a template's inheritance DAG depth-first and unions
//! the own rules of every reachable template. Results are memoized by
//! template id, so shared ancestors (diamond inheritance) are derived once
//! and their grants collapse through rule-set equality.
//!
//! Security posture: template graphs are caller input. A cycle is reported as
//! [`ModelError::Cycle`] with the offending path, and traversal depth is
//! bounded by [`MAX_INHERITANCE_DEPTH`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::core::error::ModelError;
use crate::core::error::ModelResult;
use crate::core::grant::RuleSet;
use crate::core::identifiers::RoleTemplateId;
use crate::core::template::TemplateArena;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum inheritance depth walked before traversal fails.
pub const MAX_INHERITANCE_DEPTH: usize = 128;

// ============================================================================
// SECTION: Aggregate Entry
// ============================================================================

/// Memoized traversal result for one template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateEntry {
    /// Transitive union of own rules.
    pub rules: RuleSet,
    /// Every template reachable through inheritance, excluding the root.
    pub ancestors: BTreeSet<RoleTemplateId>,
}

// ============================================================================
// SECTION: Aggregator
// ============================================================================

/// Memoizing aggregator over a borrowed arena.
///
/// The arena is borrowed immutably, so memoized entries can never go stale.
/// Build a new aggregator after mutating the arena.
#[derive(Debug)]
pub struct Aggregator<'a> {
    /// Templates being aggregated.
    arena: &'a TemplateArena,
    /// Completed traversal results keyed by template id.
    memo: BTreeMap<RoleTemplateId, AggregateEntry>,
}

impl<'a> Aggregator<'a> {
    /// Creates an aggregator with an empty memo.
    #[must_use]
    pub const fn new(arena: &'a TemplateArena) -> Self {
        Self {
            arena,
            memo: BTreeMap::new(),
        }
    }

    /// Returns the arena the aggregator reads from.
    #[must_use]
    pub const fn arena(&self) -> &'a TemplateArena {
        self.arena
    }

    /// Returns the main aggregated rule set of a template.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] when the template or an ancestor is unknown, the
    /// graph contains a cycle, or the depth limit is exceeded.
    pub fn aggregate(&mut self, id: &RoleTemplateId) -> ModelResult<RuleSet> {
        Ok(self.entry(id)?.rules)
    }

    /// Returns every template reachable from `id` through inheritance.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] on the same conditions as [`Self::aggregate`].
    pub fn ancestors(&mut self, id: &RoleTemplateId) -> ModelResult<BTreeSet<RoleTemplateId>> {
        Ok(self.entry(id)?.ancestors)
    }

    /// Returns the full memoized entry for a template.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] on the same conditions as [`Self::aggregate`].
    pub fn entry(&mut self, id: &RoleTemplateId) -> ModelResult<AggregateEntry> {
        let mut path = Vec::new();
        self.visit(id, None, &mut path)
    }

    /// Aggregates every template in the arena, surfacing the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first [`ModelError`] met in id order.
    pub fn aggregate_all(&mut self) -> ModelResult<BTreeMap<RoleTemplateId, RuleSet>> {
        let arena = self.arena;
        let mut out = BTreeMap::new();
        for template in arena.iter() {
            out.insert(template.id.clone(), self.aggregate(&template.id)?);
        }
        Ok(out)
    }

    /// Visits a template, returning its memoized entry.
    fn visit(
        &mut self,
        id: &RoleTemplateId,
        referrer: Option<&RoleTemplateId>,
        path: &mut Vec<RoleTemplateId>,
    ) -> ModelResult<AggregateEntry> {
        if let Some(done) = self.memo.get(id) {
            return Ok(done.clone());
        }
        if let Some(start) = path.iter().position(|seen| seen == id) {
            let mut cycle = path[start ..].to_vec();
            cycle.push(id.clone());
            return Err(ModelError::Cycle {
                path: cycle,
            });
        }
        if path.len() >= MAX_INHERITANCE_DEPTH {
            return Err(ModelError::TooDeep {
                max_depth: MAX_INHERITANCE_DEPTH,
                id: id.clone(),
            });
        }
        let arena = self.arena;
        let template = arena.get(id).ok_or_else(|| ModelError::UnknownTemplate {
            id: id.clone(),
            referenced_by: referrer.cloned(),
        })?;

        path.push(id.clone());
        let mut entry = AggregateEntry {
            rules: template.own_rules(),
            ancestors: BTreeSet::new(),
        };
        for parent in &template.inherited {
            let inherited = self.visit(parent, Some(id), path)?;
            entry.rules.union_with(&inherited.rules);
            entry.ancestors.insert(parent.clone());
            entry.ancestors.extend(inherited.ancestors);
        }
        path.pop();

        self.memo.insert(id.clone(), entry.clone());
        Ok(entry)
    }
}

// ============================================================================
// SECTION: Free Functions
// ============================================================================

/// Computes the main aggregated rule set of one template.
///
/// # Errors
///
/// Returns [`ModelError`] when the graph rooted at `id` is not a valid DAG
/// over templates present in the arena.
pub fn aggregate(arena: &TemplateArena, id: &RoleTemplateId) -> ModelResult<RuleSet> {
    Aggregator::new(arena).aggregate(id)
}

/// Checks the whole arena for dangling references and cycles.
///
/// # Errors
///
/// Returns the first [`ModelError`] found.
pub fn validate_arena(arena: &TemplateArena) -> ModelResult<()> {
    arena.validate_references()?;
    Aggregator::new(arena).aggregate_all().map(|_| ())
}
