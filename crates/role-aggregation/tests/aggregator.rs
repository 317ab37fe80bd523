// crates/role-aggregation/tests/aggregator.rs
// ============================================================================
// Module: Aggregator Tests
// Description: Transitive rule unions over inheritance DAGs.
// ============================================================================
//! ## Overview
//! Validates idempotent, fixed-point aggregation, diamond deduplication, and
//! fatal handling of cycles, dangling references, and excessive depth.

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

mod common;

use common::arena;
use common::cluster_template;
use common::grant;
use common::read_deployments;
use common::read_pods;
use common::read_projects;
use proptest::prelude::*;
use role_aggregation::Aggregator;
use role_aggregation::MAX_INHERITANCE_DEPTH;
use role_aggregation::ModelError;
use role_aggregation::PermissionGrant;
use role_aggregation::RoleScope;
use role_aggregation::RoleTemplate;
use role_aggregation::RoleTemplateId;
use role_aggregation::RuleSet;
use role_aggregation::TemplateArena;
use role_aggregation::aggregate;
use role_aggregation::validate_arena;

type TestResult = Result<(), String>;

// ============================================================================
// SECTION: Basic Aggregation
// ============================================================================

#[test]
fn leaf_template_aggregates_to_own_rules() -> TestResult {
    let arena = arena(vec![cluster_template("leaf", &[read_pods()], &[])])?;
    let rules = aggregate(&arena, &"leaf".into()).map_err(|err| err.to_string())?;
    assert_eq!(rules, [read_pods()].into_iter().collect());
    Ok(())
}

#[test]
fn empty_template_aggregates_to_empty_rule_set() -> TestResult {
    let arena = arena(vec![cluster_template("empty", &[], &[])])?;
    let rules = aggregate(&arena, &"empty".into()).map_err(|err| err.to_string())?;
    assert!(rules.is_empty());
    Ok(())
}

#[test]
fn aggregation_is_transitive_not_only_immediate() -> TestResult {
    let arena = arena(vec![
        cluster_template("root", &[read_projects()], &[]),
        cluster_template("middle", &[read_deployments()], &["root"]),
        cluster_template("top", &[read_pods()], &["middle"]),
    ])?;
    let rules = aggregate(&arena, &"top".into()).map_err(|err| err.to_string())?;
    let expected: RuleSet =
        [read_pods(), read_deployments(), read_projects()].into_iter().collect();
    assert_eq!(rules, expected);
    Ok(())
}

#[test]
fn external_rules_count_only_for_external_templates() -> TestResult {
    let extra: RuleSet = [read_deployments()].into_iter().collect();
    let mut internal = cluster_template("internal", &[read_pods()], &[]);
    internal.external_rules = extra.clone();
    let external = cluster_template("external", &[read_pods()], &[]).with_external_rules(extra);
    let arena = arena(vec![internal, external])?;

    let mut aggregator = Aggregator::new(&arena);
    let internal_rules = aggregator.aggregate(&"internal".into()).map_err(|err| err.to_string())?;
    let external_rules = aggregator.aggregate(&"external".into()).map_err(|err| err.to_string())?;
    assert_eq!(internal_rules.len(), 1);
    assert_eq!(external_rules.len(), 2);
    Ok(())
}

#[test]
fn ancestors_cover_the_whole_closure() -> TestResult {
    let arena = arena(vec![
        cluster_template("c", &[], &[]),
        cluster_template("a", &[], &["c"]),
        cluster_template("b", &[], &["c"]),
        cluster_template("t", &[], &["a", "b"]),
    ])?;
    let ancestors = Aggregator::new(&arena).ancestors(&"t".into()).map_err(|err| err.to_string())?;
    let names: Vec<&str> = ancestors.iter().map(RoleTemplateId::as_str).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    Ok(())
}

// ============================================================================
// SECTION: Diamond Inheritance
// ============================================================================

#[test]
fn diamond_inheritance_contains_shared_grants_once() -> TestResult {
    let shared = grant(&["get"], "", "configmaps");
    let arena = arena(vec![
        cluster_template("c", &[shared.clone(), read_projects()], &[]),
        cluster_template("a", &[read_pods(), shared.clone()], &["c"]),
        cluster_template("b", &[read_deployments()], &["c"]),
        cluster_template("t", &[], &["a", "b"]),
    ])?;
    let rules = aggregate(&arena, &"t".into()).map_err(|err| err.to_string())?;
    assert_eq!(rules.iter().filter(|grant| **grant == shared).count(), 1);
    assert_eq!(rules.len(), 4);
    Ok(())
}

// ============================================================================
// SECTION: Failure Modes
// ============================================================================

#[test]
fn cycle_is_reported_with_path() -> TestResult {
    let arena = arena(vec![
        cluster_template("a", &[], &["b"]),
        cluster_template("b", &[], &["c"]),
        cluster_template("c", &[], &["a"]),
    ])?;
    match aggregate(&arena, &"a".into()) {
        Err(ModelError::Cycle {
            path,
        }) => {
            let names: Vec<&str> = path.iter().map(RoleTemplateId::as_str).collect();
            assert_eq!(names, vec!["a", "b", "c", "a"]);
            Ok(())
        }
        other => Err(format!("expected cycle, got {other:?}")),
    }
}

#[test]
fn self_inheritance_is_a_cycle() -> TestResult {
    let arena = arena(vec![cluster_template("loop", &[read_pods()], &["loop"])])?;
    let err = aggregate(&arena, &"loop".into()).err().ok_or("expected failure")?;
    assert_eq!(err.to_string(), "inheritance cycle detected: loop -> loop");
    Ok(())
}

#[test]
fn dangling_parent_names_the_referrer() -> TestResult {
    let arena = arena(vec![cluster_template("child", &[], &["ghost"])])?;
    let err = aggregate(&arena, &"child".into()).err().ok_or("expected failure")?;
    assert_eq!(
        err,
        ModelError::UnknownTemplate {
            id: "ghost".into(),
            referenced_by: Some("child".into()),
        }
    );
    assert!(validate_arena(&arena).is_err());
    Ok(())
}

#[test]
fn excessive_depth_is_rejected() -> TestResult {
    let mut templates = vec![cluster_template("t0", &[read_pods()], &[])];
    for index in 1 ..= MAX_INHERITANCE_DEPTH {
        let parent = format!("t{}", index - 1);
        templates.push(cluster_template(&format!("t{index}"), &[], &[parent.as_str()]));
    }
    let arena = arena(templates)?;
    let top: RoleTemplateId = format!("t{MAX_INHERITANCE_DEPTH}").into();
    assert!(matches!(aggregate(&arena, &top), Err(ModelError::TooDeep { .. })));
    Ok(())
}

#[test]
fn duplicate_template_ids_are_rejected() {
    let result = TemplateArena::from_templates(vec![
        RoleTemplate::new("same", RoleScope::Cluster),
        RoleTemplate::new("same", RoleScope::Project),
    ]);
    assert_eq!(result.err(), Some(ModelError::DuplicateTemplate("same".into())));
}

#[test]
fn replacing_inheritance_is_wholesale() -> TestResult {
    let mut arena = arena(vec![
        cluster_template("a", &[read_pods()], &[]),
        cluster_template("b", &[read_projects()], &[]),
        cluster_template("t", &[], &["a"]),
    ])?;
    arena.replace_inherited(&"t".into(), vec!["b".into()]).map_err(|err| err.to_string())?;
    let rules = aggregate(&arena, &"t".into()).map_err(|err| err.to_string())?;
    assert_eq!(rules, [read_projects()].into_iter().collect());
    Ok(())
}

// ============================================================================
// SECTION: Properties
// ============================================================================

/// Pool of grants random templates draw from.
fn grant_pool() -> Vec<PermissionGrant> {
    vec![
        read_pods(),
        read_deployments(),
        read_projects(),
        grant(&["get"], "", "configmaps"),
        grant(&["create"], "batch", "jobs"),
        grant(&["*"], "management.cattle.io", "nodes"),
    ]
}

/// Strategy producing DAG shapes: per node, own grant indexes and parent indexes.
fn arb_dag() -> impl Strategy<Value = Vec<(Vec<usize>, Vec<usize>)>> {
    prop::collection::vec(
        (prop::collection::vec(0usize .. 6, 0 .. 3), prop::collection::vec(0usize .. 8, 0 .. 3)),
        1 .. 8,
    )
}

/// Builds an arena where node `i` may only inherit nodes with lower indexes.
fn build_dag(shape: &[(Vec<usize>, Vec<usize>)]) -> TemplateArena {
    let pool = grant_pool();
    let mut arena = TemplateArena::new();
    for (index, (rules, parents)) in shape.iter().enumerate() {
        let mut template = RoleTemplate::new(format!("n{index}"), RoleScope::Cluster);
        for rule in rules {
            template = template.with_rule(pool[*rule].clone());
        }
        for parent in parents.iter().filter(|parent| **parent < index) {
            template = template.inheriting(format!("n{parent}"));
        }
        arena.insert(template).unwrap();
    }
    arena
}

proptest! {
    #[test]
    fn aggregation_is_idempotent(shape in arb_dag()) {
        let arena = build_dag(&shape);
        for template in arena.iter() {
            let first = aggregate(&arena, &template.id).unwrap();
            let second = aggregate(&arena, &template.id).unwrap();
            prop_assert_eq!(first.digest().unwrap(), second.digest().unwrap());
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn aggregation_is_the_fixed_point_union(shape in arb_dag()) {
        let arena = build_dag(&shape);
        let mut aggregator = Aggregator::new(&arena);
        for template in arena.iter() {
            let mut expected = template.own_rules();
            for parent in &template.inherited {
                expected.union_with(&aggregate(&arena, parent).unwrap());
            }
            prop_assert_eq!(aggregator.aggregate(&template.id).unwrap(), expected);
        }
    }

    #[test]
    fn memoized_and_fresh_aggregation_agree(shape in arb_dag()) {
        let arena = build_dag(&shape);
        let all = Aggregator::new(&arena).aggregate_all().unwrap();
        for (id, rules) in all {
            prop_assert_eq!(rules, aggregate(&arena, &id).unwrap());
        }
    }
}
