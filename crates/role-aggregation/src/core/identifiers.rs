// crates/role-aggregation/src/core/identifiers.rs
// ============================================================================
// Module: Role Aggregation Identifiers
// Description: Opaque identifiers for templates, clusters, projects, and bindings.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque strings that serialize transparently. Validation of
//! naming rules is the platform's concern; these wrappers only keep the
//! different kinds of names from being mixed up.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Macro
// ============================================================================

/// Declares a transparent string identifier with the standard conversions.
macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

string_identifier! {
    /// Role template identifier (the template's object name).
    RoleTemplateId
}

string_identifier! {
    /// Downstream cluster identifier.
    ClusterId
}

string_identifier! {
    /// Project identifier, unique within its cluster.
    ProjectId
}

string_identifier! {
    /// Namespace name inside a cluster.
    NamespaceName
}

string_identifier! {
    /// Binding object name (cluster-scope or project-scope binding).
    BindingName
}

// ============================================================================
// SECTION: Cluster References
// ============================================================================

/// Reference to either the management cluster or a downstream cluster.
///
/// # Invariants
/// - `Local` always denotes the single management cluster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "placement", content = "cluster", rename_all = "snake_case")]
pub enum ClusterRef {
    /// The local/management cluster hosting the control plane.
    Local,
    /// A managed downstream cluster.
    Downstream(ClusterId),
}

impl ClusterRef {
    /// Returns true for the management cluster.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }
}

impl fmt::Display for ClusterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Downstream(cluster) => write!(f, "downstream:{cluster}"),
        }
    }
}
