// system-tests/tests/suites/binding_fanout.rs
// ============================================================================
// Module: Binding Fan-out Tests
// Description: Grant fan-out for cluster and project bindings.
// Purpose: Validate predicted grant counts and targets against the platform.
// Dependencies: system-tests helpers
// ============================================================================

//! ## Overview
//! Grant fan-out for cluster and project bindings.
//! Invariants:
//! - Project bindings produce one downstream grant per namespace.
//! - Management grants live in the backing namespace of the management cluster.
//! - Counts are additive across a principal's bindings.

use helpers::artifacts::RunSummary;
use helpers::fixtures::cluster;
use helpers::fixtures::cluster_binding;
use helpers::fixtures::cluster_template;
use helpers::fixtures::manage_prtbs;
use helpers::fixtures::project;
use helpers::fixtures::project_binding;
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
use role_aggregation::CORE_API_GROUP;
use role_aggregation::ClusterRef;
use role_aggregation::GrantCounts;
use role_aggregation::GrantKind;
use role_aggregation::NamespaceName;
use role_aggregation::project_namespace;

use crate::helpers;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn cluster_binding_grants_one_cluster_role_binding() -> TestResult {
    let report = RunSummary::start("cluster_binding_fanout")?;
    let harness = SystemHarness::new()?;
    harness.run("fanout-cluster", |scenario| {
        let reader = template_id(scenario.names(), "reader");
        let dana = user(scenario.names(), "dana");
        scenario.create_template(cluster_template(&reader, &[read_pods()], &[]))?;
        let binding = cluster_binding(scenario.names(), &reader, &dana);
        scenario.bind(binding)?;
        scenario.await_convergence()?;
        scenario.verify_grants(&dana)?;

        let grants = scenario.observed_grants(&dana)?;
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].kind, GrantKind::ClusterRoleBinding);
        assert_eq!(grants[0].cluster, ClusterRef::Downstream(cluster()));
        Ok(())
    })?;
    report.passed(harness.audit().events().len())?;
    Ok(())
}

#[test]
fn project_binding_grants_once_per_namespace() -> TestResult {
    let report = RunSummary::start("project_binding_fanout")?;
    let harness = SystemHarness::new()?;
    harness.run("fanout-project", |scenario| {
        let member = template_id(scenario.names(), "member");
        let erin = user(scenario.names(), "erin");
        let project = project(scenario.names());
        let namespaces: Vec<NamespaceName> = ["ns-a", "ns-b", "ns-c"]
            .into_iter()
            .map(|stem| NamespaceName::new(scenario.names().issue(stem)))
            .collect();
        scenario.create_template(project_template(&member, &[read_pods(), manage_prtbs()], &[]))?;
        scenario.create_project(&cluster(), &project)?;
        for namespace in &namespaces {
            scenario.create_namespace(&cluster(), &project, namespace)?;
        }
        let binding = project_binding(scenario.names(), &member, &erin, &project);
        scenario.bind(binding)?;
        scenario.await_convergence()?;
        scenario.verify_grants(&erin)?;
        assert_eq!(
            scenario.observed_counts(&erin)?,
            GrantCounts {
                local: 1,
                downstream: 3,
            }
        );

        let backing = project_namespace(&cluster(), &project);
        let local = scenario
            .observed_grants(&erin)?
            .into_iter()
            .find(|grant| grant.cluster.is_local());
        assert_eq!(local.and_then(|grant| grant.namespace), Some(backing));

        let downstream = ClusterRef::Downstream(cluster());
        let list_pods = ProbeRequest::new(downstream, ProbeVerb::List, CORE_API_GROUP, "pods");
        for namespace in &namespaces {
            let request = list_pods.clone().in_namespace(namespace.clone());
            scenario.expect_probe(&erin, &request, ProbeOutcome::Allowed)?;
        }
        scenario.expect_probe(&erin, &list_pods, ProbeOutcome::Denied)?;
        Ok(())
    })?;
    report.passed(harness.audit().events().len())?;
    Ok(())
}

#[test]
fn project_without_namespaces_has_no_direct_grants() -> TestResult {
    let report = RunSummary::start("empty_project_fanout")?;
    let harness = SystemHarness::new()?;
    harness.run("fanout-empty-project", |scenario| {
        let member = template_id(scenario.names(), "member");
        let frank = user(scenario.names(), "frank");
        let project = project(scenario.names());
        scenario.create_template(project_template(&member, &[read_pods(), manage_prtbs()], &[]))?;
        scenario.create_project(&cluster(), &project)?;
        let binding = project_binding(scenario.names(), &member, &frank, &project);
        scenario.bind(binding)?;
        scenario.await_convergence()?;
        scenario.verify_grants(&frank)?;
        assert_eq!(
            scenario.observed_counts(&frank)?,
            GrantCounts {
                local: 1,
                downstream: 0,
            }
        );
        Ok(())
    })?;
    report.passed(harness.audit().events().len())?;
    Ok(())
}

#[test]
fn namespaces_added_later_gain_direct_grants() -> TestResult {
    let report = RunSummary::start("late_namespace_fanout")?;
    let harness = SystemHarness::new()?;
    harness.run("fanout-late-namespace", |scenario| {
        let viewer = template_id(scenario.names(), "viewer");
        let gail = user(scenario.names(), "gail");
        let project = project(scenario.names());
        let first = NamespaceName::new(scenario.names().issue("ns"));
        let second = NamespaceName::new(scenario.names().issue("ns"));
        scenario.create_template(project_template(&viewer, &[read_pods()], &[]))?;
        scenario.create_project(&cluster(), &project)?;
        scenario.create_namespace(&cluster(), &project, &first)?;
        let binding = project_binding(scenario.names(), &viewer, &gail, &project);
        scenario.bind(binding)?;
        scenario.await_convergence()?;
        assert_eq!(scenario.observed_counts(&gail)?.downstream, 1);

        scenario.create_namespace(&cluster(), &project, &second)?;
        scenario.await_convergence()?;
        scenario.verify_grants(&gail)?;
        assert_eq!(
            scenario.observed_counts(&gail)?,
            GrantCounts {
                local: 0,
                downstream: 2,
            }
        );
        Ok(())
    })?;
    report.passed(harness.audit().events().len())?;
    Ok(())
}

#[test]
fn counts_add_up_across_bindings() -> TestResult {
    let report = RunSummary::start("additive_fanout")?;
    let harness = SystemHarness::new()?;
    harness.run("fanout-additive", |scenario| {
        let operator = template_id(scenario.names(), "operator");
        let editor = template_id(scenario.names(), "editor");
        let hana = user(scenario.names(), "hana");
        let project = project(scenario.names());
        let namespace = NamespaceName::new(scenario.names().issue("ns"));
        scenario.create_template(cluster_template(&operator, &[read_projects()], &[]))?;
        scenario.create_template(project_template(&editor, &[write_configmaps()], &[]))?;
        scenario.create_project(&cluster(), &project)?;
        scenario.create_namespace(&cluster(), &project, &namespace)?;
        let cluster_wide = cluster_binding(scenario.names(), &operator, &hana);
        let scoped = project_binding(scenario.names(), &editor, &hana, &project);
        scenario.bind(cluster_wide)?;
        scenario.bind(scoped)?;
        scenario.await_convergence()?;
        scenario.verify_grants(&hana)?;
        assert_eq!(
            scenario.observed_counts(&hana)?,
            GrantCounts {
                local: 1,
                downstream: 2,
            }
        );
        assert_eq!(scenario.expected_fanout(&hana)?.bindings.len(), 2);
        Ok(())
    })?;
    report.passed(harness.audit().events().len())?;
    Ok(())
}
