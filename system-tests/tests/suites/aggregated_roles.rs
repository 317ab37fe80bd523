// system-tests/tests/suites/aggregated_roles.rs
// ============================================================================
// Module: Aggregated Role Tests
// Description: Object inventory and aggregation checks across placements.
// Purpose: Validate predicted aggregated roles against the platform.
// Dependencies: system-tests helpers
// ============================================================================

//! ## Overview
//! Object inventory and aggregation checks across placements.
//! Invariants:
//! - Management grants appear only in the management cluster.
//! - Every template verifies immediately after convergence.

use helpers::artifacts::RunSummary;
use helpers::fixtures::cluster;
use helpers::fixtures::cluster_binding;
use helpers::fixtures::cluster_template;
use helpers::fixtures::manage_prtbs;
use helpers::fixtures::project_template;
use helpers::fixtures::read_pods;
use helpers::fixtures::read_projects;
use helpers::fixtures::template_id;
use helpers::fixtures::user;
use helpers::fixtures::write_configmaps;
use helpers::harness::SystemHarness;
use rbac_harness_verifier::ProbeOutcome;
use rbac_harness_verifier::ProbeRequest;
use rbac_harness_verifier::ProbeVerb;
use rbac_harness_verifier::RoleObjectRecord;
use role_aggregation::CORE_API_GROUP;
use role_aggregation::ClusterRef;
use role_aggregation::GrantCounts;
use role_aggregation::MANAGEMENT_API_GROUP;
use role_aggregation::RoleObjectKind;
use role_aggregation::RuleSet;
use role_aggregation::role_object_name;

use crate::helpers;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Splits observed object counts into management-cluster and downstream.
fn placement_counts(records: &[RoleObjectRecord]) -> (usize, usize) {
    let local = records.iter().filter(|record| record.cluster.is_local()).count();
    (local, records.len() - local)
}

#[test]
fn management_child_projects_six_local_and_four_downstream() -> TestResult {
    let report = RunSummary::start("management_child_projects")?;
    let harness = SystemHarness::new()?;
    harness.run("aggregated-mgmt-child", |scenario| {
        let child = template_id(scenario.names(), "c");
        let wrapper = template_id(scenario.names(), "m");
        let alice = user(scenario.names(), "alice");
        scenario.create_template(cluster_template(&child, &[read_projects()], &[]))?;
        scenario.create_template(cluster_template(&wrapper, &[read_pods()], &[&child]))?;
        let binding = cluster_binding(scenario.names(), &wrapper, &alice);
        scenario.bind(binding)?;
        scenario.await_convergence()?;
        scenario.verify_all()?;

        let mut records = scenario.observed_role_objects(&child)?;
        assert_eq!(placement_counts(&records), (4, 2));
        records.extend(scenario.observed_role_objects(&wrapper)?);
        assert_eq!(placement_counts(&records), (6, 4));
        assert_eq!(
            scenario.observed_counts(&alice)?,
            GrantCounts {
                local: 1,
                downstream: 1,
            }
        );

        let downstream = ClusterRef::Downstream(cluster());
        let get_pods =
            ProbeRequest::new(downstream.clone(), ProbeVerb::Get, CORE_API_GROUP, "pods");
        scenario.expect_probe(&alice, &get_pods, ProbeOutcome::Allowed)?;
        let list_projects =
            ProbeRequest::new(downstream, ProbeVerb::List, MANAGEMENT_API_GROUP, "projects");
        scenario.expect_probe(&alice, &list_projects, ProbeOutcome::Denied)?;
        Ok(())
    })?;
    report.passed(harness.audit().events().len())?;
    Ok(())
}

#[test]
fn diamond_templates_round_trip_after_convergence() -> TestResult {
    let report = RunSummary::start("diamond_round_trip")?;
    let harness = SystemHarness::new()?;
    harness.run("aggregated-diamond", |scenario| {
        let base = template_id(scenario.names(), "base");
        let left = template_id(scenario.names(), "left");
        let right = template_id(scenario.names(), "right");
        let top = template_id(scenario.names(), "top");
        scenario.create_template(project_template(&base, &[read_pods()], &[]))?;
        scenario.create_template(project_template(&left, &[write_configmaps()], &[&base]))?;
        scenario.create_template(project_template(&right, &[manage_prtbs()], &[&base]))?;
        scenario.create_template(project_template(&top, &[], &[&left, &right]))?;
        scenario.await_convergence()?;
        scenario.verify_all()?;

        let aggregator = role_object_name(&top, RoleObjectKind::Aggregator);
        let local_top = scenario
            .observed_role_objects(&top)?
            .into_iter()
            .find(|record| record.cluster.is_local() && record.name == aggregator);
        let expected: RuleSet =
            [read_pods(), write_configmaps(), manage_prtbs()].into_iter().collect();
        assert_eq!(local_top.map(|record| record.rules), Some(expected));
        Ok(())
    })?;
    report.passed(harness.audit().events().len())?;
    Ok(())
}

#[test]
fn inheritance_replacement_reaggregates_dependents() -> TestResult {
    let report = RunSummary::start("inheritance_replacement")?;
    let harness = SystemHarness::new()?;
    harness.run("aggregated-rewire", |scenario| {
        let first = template_id(scenario.names(), "first");
        let second = template_id(scenario.names(), "second");
        let child = template_id(scenario.names(), "child");
        let grandchild = template_id(scenario.names(), "grandchild");
        scenario.create_template(cluster_template(&first, &[read_pods()], &[]))?;
        scenario.create_template(cluster_template(&second, &[read_projects()], &[]))?;
        scenario.create_template(cluster_template(&child, &[], &[&first]))?;
        scenario.create_template(cluster_template(&grandchild, &[], &[&child]))?;
        scenario.await_convergence()?;
        scenario.verify_all()?;

        scenario.set_inheritance(&child, vec![second.clone()])?;
        scenario.await_convergence()?;
        scenario.verify_all()?;
        let aggregator = role_object_name(&grandchild, RoleObjectKind::Aggregator);
        let rules = scenario
            .observed_role_objects(&grandchild)?
            .into_iter()
            .find(|record| record.cluster.is_local() && record.name == aggregator)
            .map(|record| record.rules);
        assert_eq!(rules, Some([read_projects()].into_iter().collect()));
        Ok(())
    })?;
    report.passed(harness.audit().events().len())?;
    Ok(())
}

#[test]
fn external_rules_flow_into_inheriting_templates() -> TestResult {
    let report = RunSummary::start("external_rules")?;
    let harness = SystemHarness::new()?;
    harness.run("aggregated-external", |scenario| {
        let external = template_id(scenario.names(), "external");
        let child = template_id(scenario.names(), "child");
        let rules: RuleSet = [read_pods()].into_iter().collect();
        scenario.create_template(cluster_template(&external, &[], &[]).with_external_rules(rules))?;
        scenario.create_template(cluster_template(&child, &[write_configmaps()], &[&external]))?;
        scenario.await_convergence()?;
        scenario.verify_all()
    })?;
    report.passed(harness.audit().events().len())?;
    Ok(())
}
