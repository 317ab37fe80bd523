// crates/role-aggregation/src/core/mod.rs
// ============================================================================
// Module: Role Aggregation Core Types
// Description: Value types for grants, templates, bindings, and configuration.
// Purpose: Group the data model consumed by the runtime algorithms.
// Dependencies: serde, serde_jcs, sha2, thiserror
// ============================================================================

//! ## Overview
//! Core types are plain values: they own no I/O and carry no derived state.
//! Everything computed from them lives in [`crate::runtime`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod binding;
pub mod catalog;
pub mod error;
pub mod grant;
pub mod hashing;
pub mod identifiers;
pub mod policy;
pub mod template;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use binding::Binding;
pub use binding::BindingTarget;
pub use binding::Principal;
pub use binding::cluster_namespace;
pub use binding::project_namespace;
pub use catalog::CLUSTER_ENGINE_API_GROUP;
pub use catalog::CORE_API_GROUP;
pub use catalog::MANAGEMENT_API_GROUP;
pub use catalog::ManagementApiGroups;
pub use catalog::ManagementResourceCatalog;
pub use catalog::PROJECT_ENGINE_API_GROUP;
pub use error::ModelError;
pub use error::ModelResult;
pub use grant::PermissionGrant;
pub use grant::RuleSet;
pub use grant::RuleSetDiff;
pub use grant::WILDCARD;
pub use hashing::HashError;
pub use hashing::RuleDigest;
pub use hashing::canonical_json_bytes;
pub use identifiers::BindingName;
pub use identifiers::ClusterId;
pub use identifiers::ClusterRef;
pub use identifiers::NamespaceName;
pub use identifiers::ProjectId;
pub use identifiers::RoleTemplateId;
pub use policy::InheritanceChangePolicy;
pub use policy::MaterializationPolicy;
pub use policy::TemplateDeletionPolicy;
pub use template::RoleScope;
pub use template::RoleTemplate;
pub use template::TemplateArena;
