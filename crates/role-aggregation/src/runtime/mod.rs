// crates/role-aggregation/src/runtime/mod.rs
// ============================================================================
// Module: Role Aggregation Runtime
// Description: Classification, aggregation, projection, and fan-out algorithms.
// Purpose: Compute every expectation the verifier asserts against.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Runtime modules are pure functions of the core types. Data flows from the
//! classifier into the aggregator, then the projector, the object inventory,
//! and the binding fan-out model.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod aggregator;
pub mod classifier;
pub mod fanout;
pub mod inventory;
pub mod projector;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use aggregator::AggregateEntry;
pub use aggregator::Aggregator;
pub use aggregator::MAX_INHERITANCE_DEPTH;
pub use aggregator::aggregate;
pub use aggregator::validate_arena;
pub use classifier::GrantClass;
pub use classifier::RulePartition;
pub use classifier::classify;
pub use classifier::is_management;
pub use classifier::management_subset;
pub use classifier::partition;
pub use classifier::regular_subset;
pub use fanout::BindingFanout;
pub use fanout::BindingSnapshot;
pub use fanout::ExpectedGrant;
pub use fanout::FanoutModel;
pub use fanout::GrantCounts;
pub use fanout::GrantKind;
pub use fanout::GrantPurpose;
pub use fanout::PrincipalFanout;
pub use fanout::ProjectDirectory;
pub use inventory::ExpectedRoleObject;
pub use inventory::ObjectInventory;
pub use inventory::RoleObjectKind;
pub use inventory::role_object_name;
pub use projector::AggregateKind;
pub use projector::AggregatedRole;
pub use projector::ManagementKinds;
pub use projector::Placement;
pub use projector::Projection;
pub use projector::Projector;
pub use projector::project;
