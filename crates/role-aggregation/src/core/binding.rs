// crates/role-aggregation/src/core/binding.rs
// ============================================================================
// Module: Principals and Bindings
// Description: Associations of role templates with principals in a scope.
// Purpose: Describe the objects whose creation triggers grant materialization.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Binding`] ties one role template to one principal inside a cluster or a
//! project. Creating a binding makes the platform materialize low-level grants;
//! deleting it removes them again.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::BindingName;
use crate::core::identifiers::ClusterId;
use crate::core::identifiers::NamespaceName;
use crate::core::identifiers::ProjectId;
use crate::core::identifiers::RoleTemplateId;
use crate::core::template::RoleScope;

// ============================================================================
// SECTION: Principal
// ============================================================================

/// Subject a binding grants permissions to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Principal {
    /// Individual user.
    User(String),
    /// Group of users.
    Group(String),
}

impl Principal {
    /// Returns the principal's name without its kind.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::User(name) | Self::Group(name) => name,
        }
    }

    /// Returns a stable label for the principal kind.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Group(_) => "group",
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind_label(), self.name())
    }
}

// ============================================================================
// SECTION: Binding Target
// ============================================================================

/// Scope target of a binding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum BindingTarget {
    /// Binding over a whole downstream cluster.
    Cluster {
        /// Target cluster.
        cluster: ClusterId,
    },
    /// Binding over a project inside a downstream cluster.
    Project {
        /// Cluster owning the project.
        cluster: ClusterId,
        /// Target project.
        project: ProjectId,
    },
}

impl BindingTarget {
    /// Returns the scope of the target.
    #[must_use]
    pub const fn scope(&self) -> RoleScope {
        match self {
            Self::Cluster {
                ..
            } => RoleScope::Cluster,
            Self::Project {
                ..
            } => RoleScope::Project,
        }
    }

    /// Returns the downstream cluster the target lives in.
    #[must_use]
    pub const fn cluster(&self) -> &ClusterId {
        match self {
            Self::Cluster {
                cluster,
            }
            | Self::Project {
                cluster, ..
            } => cluster,
        }
    }
}

impl fmt::Display for BindingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cluster {
                cluster,
            } => write!(f, "{cluster}"),
            Self::Project {
                cluster,
                project,
            } => write!(f, "{cluster}:{project}"),
        }
    }
}

// ============================================================================
// SECTION: Binding
// ============================================================================

/// Association of a role template with a principal in a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    /// Binding object name.
    pub name: BindingName,
    /// Bound role template.
    pub role_template: RoleTemplateId,
    /// Principal receiving the permissions.
    pub principal: Principal,
    /// Cluster or project the binding applies to.
    pub target: BindingTarget,
}

impl Binding {
    /// Creates a binding.
    #[must_use]
    pub fn new(
        name: impl Into<BindingName>,
        role_template: impl Into<RoleTemplateId>,
        principal: Principal,
        target: BindingTarget,
    ) -> Self {
        Self {
            name: name.into(),
            role_template: role_template.into(),
            principal,
            target,
        }
    }

    /// Returns the binding's scope.
    #[must_use]
    pub const fn scope(&self) -> RoleScope {
        self.target.scope()
    }
}

// ============================================================================
// SECTION: Management Namespaces
// ============================================================================

/// Returns the management-cluster namespace that backs a downstream cluster.
#[must_use]
pub fn cluster_namespace(cluster: &ClusterId) -> NamespaceName {
    NamespaceName::new(cluster.as_str())
}

/// Returns the management-cluster namespace that backs a project.
#[must_use]
pub fn project_namespace(cluster: &ClusterId, project: &ProjectId) -> NamespaceName {
    NamespaceName::new(format!("{cluster}-{project}"))
}
