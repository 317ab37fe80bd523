// crates/rbac-harness-verifier/src/platform.rs
// ============================================================================
// Module: Platform Query Surface
// Description: Narrow read, write, and probe interface to the RBAC platform.
// Purpose: Keep the verifier independent of any platform client library.
// Dependencies: role-aggregation, serde, thiserror
// ============================================================================

//! ## Overview
//! The verifier talks to the platform through [`PlatformClient`] only. Reads
//! are filtered by [`ObjectSelector`] (labels, exact name or namespace, and
//! owning principal). Writes create and delete templates, bindings, projects,
//! and namespaces. A probe impersonates a principal for one operation.
//!
//! Objects are identified by `(name)` or `(namespace, name)`; the wire format
//! is the platform's concern.
//!
//! Security posture: every response is untrusted and is compared, never
//! assumed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use role_aggregation::Binding;
use role_aggregation::BindingName;
use role_aggregation::ClusterId;
use role_aggregation::ClusterRef;
use role_aggregation::GrantKind;
use role_aggregation::NamespaceName;
use role_aggregation::Principal;
use role_aggregation::ProjectId;
use role_aggregation::RoleTemplate;
use role_aggregation::RoleTemplateId;
use role_aggregation::RuleSet;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Labels
// ============================================================================

/// Label carrying the template a role object or grant derives from.
pub const LABEL_ROLE_TEMPLATE: &str = "rbac-harness.io/role-template";
/// Label carrying the role object kind.
pub const LABEL_OBJECT_KIND: &str = "rbac-harness.io/object-kind";
/// Label carrying the binding that caused a grant.
pub const LABEL_BINDING: &str = "rbac-harness.io/binding";
/// Label carrying the reason a grant exists.
pub const LABEL_GRANT_PURPOSE: &str = "rbac-harness.io/grant-purpose";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The caller is authenticated but not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// The caller could not be authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The named object does not exist.
    #[error("{kind} {name} not found")]
    NotFound {
        /// Object kind label.
        kind: &'static str,
        /// Object name.
        name: String,
    },
    /// The named object already exists.
    #[error("{kind} {name} already exists")]
    Conflict {
        /// Object kind label.
        kind: &'static str,
        /// Object name.
        name: String,
    },
    /// The request was rejected as malformed.
    #[error("invalid request: {0}")]
    Invalid(String),
    /// The platform could not be reached or answered inconsistently.
    #[error("platform transport error: {0}")]
    Transport(String),
}

impl PlatformError {
    /// Returns true for an authorization denial.
    #[must_use]
    pub const fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }

    /// Returns true when the target object does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound {
                ..
            }
        )
    }
}

// ============================================================================
// SECTION: Selectors
// ============================================================================

/// Filter for list operations. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSelector {
    /// Labels that must all be present with equal values.
    pub labels: BTreeMap<String, String>,
    /// Exact object name.
    pub name: Option<String>,
    /// Exact namespace.
    pub namespace: Option<NamespaceName>,
    /// Owning principal.
    pub principal: Option<Principal>,
}

impl ObjectSelector {
    /// Creates a selector matching everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects objects derived from a template.
    #[must_use]
    pub fn for_template(id: &RoleTemplateId) -> Self {
        Self::new().with_label(LABEL_ROLE_TEMPLATE, id.as_str())
    }

    /// Selects objects owned by a principal.
    #[must_use]
    pub fn for_principal(principal: &Principal) -> Self {
        Self::new().with_principal(principal.clone())
    }

    /// Adds a required label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Restricts to an exact object name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Restricts to an exact namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: NamespaceName) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Restricts to a principal.
    #[must_use]
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Returns true when every required label is present on `labels`.
    #[must_use]
    pub fn matches_labels(&self, labels: &BTreeMap<String, String>) -> bool {
        self.labels.iter().all(|(key, value)| labels.get(key) == Some(value))
    }

    /// Returns true when the selector's name restriction accepts `name`.
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.as_deref().is_none_or(|wanted| wanted == name)
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Role object as observed on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleObjectRecord {
    /// Cluster holding the object.
    pub cluster: ClusterRef,
    /// Object name.
    pub name: String,
    /// Object labels.
    pub labels: BTreeMap<String, String>,
    /// Rules currently carried by the object.
    pub rules: RuleSet,
}

/// Low-level grant object as observed on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRecord {
    /// Cluster holding the grant.
    pub cluster: ClusterRef,
    /// Grant object kind.
    pub kind: GrantKind,
    /// Grant object name.
    pub name: String,
    /// Namespace for role bindings.
    pub namespace: Option<NamespaceName>,
    /// Name of the referenced role object.
    pub role_name: String,
    /// Principal receiving the grant.
    pub principal: Principal,
    /// Object labels.
    pub labels: BTreeMap<String, String>,
}

impl GrantRecord {
    /// Returns the binding recorded on the grant's labels, if any.
    #[must_use]
    pub fn binding(&self) -> Option<BindingName> {
        self.labels.get(LABEL_BINDING).map(BindingName::new)
    }
}

// ============================================================================
// SECTION: Probes
// ============================================================================

/// Operation attempted by a permission probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeVerb {
    /// Read one object.
    Get,
    /// List objects.
    List,
    /// Watch objects.
    Watch,
    /// Create an object.
    Create,
    /// Replace an object.
    Update,
    /// Patch an object.
    Patch,
    /// Delete an object.
    Delete,
}

impl ProbeVerb {
    /// Returns the verb as written in grants.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::List => "list",
            Self::Watch => "watch",
            Self::Create => "create",
            Self::Update => "update",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ProbeVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single operation attempted on behalf of a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeRequest {
    /// Cluster the operation targets.
    pub cluster: ClusterRef,
    /// Verb attempted.
    pub verb: ProbeVerb,
    /// API group of the resource (`""` for core).
    pub api_group: String,
    /// Plural resource name.
    pub resource: String,
    /// Namespace for namespaced resources.
    pub namespace: Option<NamespaceName>,
    /// Object name for single-object verbs.
    pub name: Option<String>,
}

impl ProbeRequest {
    /// Creates a cluster-wide probe.
    #[must_use]
    pub fn new(
        cluster: ClusterRef,
        verb: ProbeVerb,
        api_group: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            cluster,
            verb,
            api_group: api_group.into(),
            resource: resource.into(),
            namespace: None,
            name: None,
        }
    }

    /// Targets a namespace.
    #[must_use]
    pub fn in_namespace(mut self, namespace: NamespaceName) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Targets a named object.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl fmt::Display for ProbeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.cluster, self.verb, self.resource)?;
        if !self.api_group.is_empty() {
            write!(f, ".{}", self.api_group)?;
        }
        if let Some(namespace) = &self.namespace {
            write!(f, " in {namespace}")?;
        }
        if let Some(name) = &self.name {
            write!(f, " named {name}")?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Client Interface
// ============================================================================

/// Synchronous client for the RBAC platform.
pub trait PlatformClient {
    /// Lists the downstream clusters managed by the platform.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the platform cannot be queried.
    fn list_downstream_clusters(&self) -> Result<Vec<ClusterId>, PlatformError>;

    /// Fetches one role template.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the platform cannot be queried.
    fn get_role_template(&self, id: &RoleTemplateId) -> Result<Option<RoleTemplate>, PlatformError>;

    /// Lists every role template.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the platform cannot be queried.
    fn list_role_templates(&self) -> Result<Vec<RoleTemplate>, PlatformError>;

    /// Creates a role template.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Conflict`] when the id is taken.
    fn create_role_template(&self, template: &RoleTemplate) -> Result<(), PlatformError>;

    /// Replaces a role template.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] when the template does not exist.
    fn update_role_template(&self, template: &RoleTemplate) -> Result<(), PlatformError>;

    /// Deletes a role template.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] when the template does not exist.
    fn delete_role_template(&self, id: &RoleTemplateId) -> Result<(), PlatformError>;

    /// Lists materialized role objects in one cluster.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the cluster is unknown or unreachable.
    fn list_role_objects(
        &self,
        cluster: &ClusterRef,
        selector: &ObjectSelector,
    ) -> Result<Vec<RoleObjectRecord>, PlatformError>;

    /// Lists low-level grant objects in one cluster.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the cluster is unknown or unreachable.
    fn list_grants(
        &self,
        cluster: &ClusterRef,
        selector: &ObjectSelector,
    ) -> Result<Vec<GrantRecord>, PlatformError>;

    /// Lists binding objects.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the platform cannot be queried.
    fn list_bindings(&self, selector: &ObjectSelector) -> Result<Vec<Binding>, PlatformError>;

    /// Creates a binding.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the binding name is taken or the target
    /// does not exist.
    fn create_binding(&self, binding: &Binding) -> Result<(), PlatformError>;

    /// Deletes a binding.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] when the binding does not exist.
    fn delete_binding(&self, name: &BindingName) -> Result<(), PlatformError>;

    /// Creates a project in a downstream cluster.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the cluster is unknown or the project exists.
    fn create_project(&self, cluster: &ClusterId, project: &ProjectId) -> Result<(), PlatformError>;

    /// Deletes a project and its namespaces.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] when the project does not exist.
    fn delete_project(&self, cluster: &ClusterId, project: &ProjectId) -> Result<(), PlatformError>;

    /// Creates a namespace inside a project.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the project is unknown or the namespace exists.
    fn create_namespace(
        &self,
        cluster: &ClusterId,
        project: &ProjectId,
        namespace: &NamespaceName,
    ) -> Result<(), PlatformError>;

    /// Deletes a namespace.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] when the namespace does not exist.
    fn delete_namespace(
        &self,
        cluster: &ClusterId,
        namespace: &NamespaceName,
    ) -> Result<(), PlatformError>;

    /// Attempts one operation as `principal`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Forbidden`] when the principal is denied and
    /// any other [`PlatformError`] when the probe itself failed.
    fn probe(&self, principal: &Principal, request: &ProbeRequest) -> Result<(), PlatformError>;
}
