// crates/rbac-harness-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for the model helpers behind the CLI commands.
// Purpose: Pin principal parsing, creation ordering, and report shapes.
// Dependencies: rbac-harness-cli main helpers
// ============================================================================

//! ## Overview
//! Validates the helpers the subcommands share: principal parsing, parent
//! first template ordering, and the aggregate and fan-out reports.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use rbac_harness_cli::fixture::Fixture;
use rbac_harness_cli::fixture::ProjectFixture;
use rbac_harness_config::HarnessConfig;
use role_aggregation::Binding;
use role_aggregation::BindingTarget;
use role_aggregation::ClusterId;
use role_aggregation::MANAGEMENT_API_GROUP;
use role_aggregation::NamespaceName;
use role_aggregation::PermissionGrant;
use role_aggregation::Placement;
use role_aggregation::Principal;
use role_aggregation::ProjectId;
use role_aggregation::RoleScope;
use role_aggregation::RoleTemplate;
use role_aggregation::RoleTemplateId;
use role_aggregation::TemplateArena;

use super::PlacementArg;
use super::aggregate_report;
use super::creation_order;
use super::fanout_report;
use super::parse_principal;
use super::scenario_name;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn read_pods() -> PermissionGrant {
    PermissionGrant::new()
        .with_verbs(["get", "list"])
        .with_api_groups([""])
        .with_resources(["pods"])
}

fn manage_prtbs() -> PermissionGrant {
    PermissionGrant::new()
        .with_verbs(["*"])
        .with_api_groups([MANAGEMENT_API_GROUP])
        .with_resources(["projectroletemplatebindings"])
}

/// Arena where `member` inherits `base` and `owner` inherits `member`.
fn chain() -> TemplateArena {
    TemplateArena::from_templates([
        RoleTemplate::new("owner", RoleScope::Project).inheriting("member"),
        RoleTemplate::new("member", RoleScope::Project)
            .inheriting("base")
            .with_rule(manage_prtbs()),
        RoleTemplate::new("base", RoleScope::Project).with_rule(read_pods()),
    ])
    .unwrap()
}

fn project_fixture() -> Fixture {
    let cluster = ClusterId::new("c-1");
    Fixture {
        downstream: vec![cluster.clone()],
        templates: chain().iter().cloned().collect(),
        projects: vec![ProjectFixture {
            cluster: cluster.clone(),
            project: ProjectId::new("p-1"),
            namespaces: vec![NamespaceName::new("ns-a"), NamespaceName::new("ns-b")],
        }],
        bindings: vec![
            Binding::new(
                "b-alice",
                "owner",
                Principal::User("alice".to_string()),
                BindingTarget::Project {
                    cluster: cluster.clone(),
                    project: ProjectId::new("p-1"),
                },
            ),
            Binding::new(
                "b-devs",
                "base",
                Principal::Group("devs".to_string()),
                BindingTarget::Cluster {
                    cluster,
                },
            ),
        ],
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn parse_principal_accepts_users_and_groups() {
    assert_eq!(parse_principal("user:alice"), Ok(Principal::User("alice".to_string())));
    assert_eq!(parse_principal("group:devs"), Ok(Principal::Group("devs".to_string())));
}

#[test]
fn parse_principal_rejects_unknown_kinds_and_empty_names() {
    assert!(parse_principal("robot:r2").is_err());
    assert!(parse_principal("user:").is_err());
    assert!(parse_principal("alice").is_err());
}

#[test]
fn creation_order_puts_parents_first() {
    let order: Vec<String> =
        creation_order(&chain()).into_iter().map(|template| template.id.to_string()).collect();
    assert_eq!(order, vec!["base", "member", "owner"]);
}

#[test]
fn creation_order_keeps_unresolvable_templates_last() {
    let arena = TemplateArena::from_templates([
        RoleTemplate::new("orphan", RoleScope::Cluster).inheriting("missing"),
        RoleTemplate::new("root", RoleScope::Cluster),
    ])
    .unwrap();
    let order: Vec<String> =
        creation_order(&arena).into_iter().map(|template| template.id.to_string()).collect();
    assert_eq!(order, vec!["root", "orphan"]);
}

#[test]
fn aggregate_report_covers_every_template_or_one() {
    let arena = chain();
    let all = aggregate_report(&arena, None).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[&RoleTemplateId::new("owner")].len(), 2);

    let one = aggregate_report(&arena, Some("base")).unwrap();
    assert_eq!(one.len(), 1);
    assert!(one[&RoleTemplateId::new("base")].contains(&read_pods()));
}

#[test]
fn aggregate_report_rejects_unknown_templates() {
    let error = aggregate_report(&chain(), Some("ghost")).unwrap_err();
    assert!(error.to_string().contains("ghost"));
}

#[test]
fn fanout_report_counts_namespaces_and_backing_grants() {
    let reports = fanout_report(&project_fixture(), &HarnessConfig::default(), None).unwrap();
    assert_eq!(reports.len(), 2);

    let alice = reports
        .iter()
        .find(|report| report.principal == Principal::User("alice".to_string()))
        .unwrap();
    assert_eq!(alice.counts.downstream, 2);
    assert_eq!(alice.counts.local, 1);
    assert_eq!(alice.grants.len(), 3);

    let devs = reports
        .iter()
        .find(|report| report.principal == Principal::Group("devs".to_string()))
        .unwrap();
    assert_eq!(devs.counts.downstream, 1);
    assert_eq!(devs.counts.local, 0);
}

#[test]
fn fanout_report_filters_by_principal() {
    let only = Principal::Group("devs".to_string());
    let reports =
        fanout_report(&project_fixture(), &HarnessConfig::default(), Some(&only)).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].principal, only);
}

#[test]
fn placement_arg_maps_to_model_placement() {
    assert_eq!(Placement::from(PlacementArg::Local), Placement::Local);
    assert_eq!(Placement::from(PlacementArg::Downstream), Placement::Downstream);
}

#[test]
fn scenario_name_uses_the_file_stem() {
    assert_eq!(scenario_name(Path::new("/tmp/fixtures/owner-chain.json")), "owner-chain");
}
