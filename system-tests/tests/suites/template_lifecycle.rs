// system-tests/tests/suites/template_lifecycle.rs
// ============================================================================
// Module: Template Lifecycle Tests
// Description: Deletion, unbinding, and inheritance changes over time.
// Purpose: Validate cleanup and materialization policies against the platform.
// Dependencies: system-tests helpers
// ============================================================================

//! ## Overview
//! Deletion, unbinding, and inheritance changes over time.
//! Invariants:
//! - Deleting a template removes its role objects in every cluster.
//! - Bindings of a deleted template stay listed unless deletion cascades.
//! - Unbinding removes every grant the binding created.
//! - Templates with dependents cannot be deleted.

use helpers::artifacts::RunSummary;
use helpers::fixtures::cluster;
use helpers::fixtures::cluster_binding;
use helpers::fixtures::cluster_template;
use helpers::fixtures::manage_prtbs;
use helpers::fixtures::project;
use helpers::fixtures::project_binding;
use helpers::fixtures::project_template;
use helpers::fixtures::read_pods;
use helpers::fixtures::template_id;
use helpers::fixtures::user;
use helpers::fixtures::write_configmaps;
use helpers::harness::SystemHarness;
use rbac_harness_verifier::ProbeOutcome;
use rbac_harness_verifier::ProbeRequest;
use rbac_harness_verifier::ProbeVerb;
use rbac_harness_verifier::VerifierError;
use role_aggregation::CORE_API_GROUP;
use role_aggregation::ClusterRef;
use role_aggregation::GrantCounts;
use role_aggregation::InheritanceChangePolicy;
use role_aggregation::MaterializationPolicy;
use role_aggregation::ModelError;
use role_aggregation::NamespaceName;
use role_aggregation::TemplateDeletionPolicy;

use crate::helpers;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Binds a lone cluster template, deletes it, and returns the grants and
/// bindings left.
fn left_after_template_deletion(
    policy: TemplateDeletionPolicy,
) -> Result<(usize, usize), String> {
    let harness = SystemHarness::with_policy(MaterializationPolicy {
        template_deletion: policy,
        ..MaterializationPolicy::default()
    })?;
    let mut remaining = None;
    harness
        .run("lifecycle-deletion-policy", |scenario| {
            let doomed = template_id(scenario.names(), "doomed");
            let ivan = user(scenario.names(), "ivan");
            scenario.create_template(cluster_template(&doomed, &[read_pods()], &[]))?;
            let binding = cluster_binding(scenario.names(), &doomed, &ivan);
            scenario.bind(binding)?;
            scenario.await_convergence()?;
            scenario.delete_template(&doomed)?;
            scenario.await_convergence()?;
            scenario.verify_bindings(&ivan)?;
            scenario.verify_grants(&ivan)?;
            assert!(scenario.observed_role_objects(&doomed)?.is_empty());
            let grants = scenario.observed_grants(&ivan)?.len();
            let bindings = scenario.observed_bindings(&ivan)?;
            assert!(bindings.iter().all(|binding| binding.role_template == doomed));
            remaining = Some((grants, bindings.len()));
            Ok(())
        })
        .map_err(|err| err.to_string())?;
    remaining.ok_or_else(|| "scenario body did not record a count".to_string())
}

/// Adds a project management parent after binding and returns the local count.
fn local_grants_after_reparenting(policy: InheritanceChangePolicy) -> Result<usize, String> {
    let harness = SystemHarness::with_policy(MaterializationPolicy {
        inheritance_change: policy,
        ..MaterializationPolicy::default()
    })?;
    let mut local = None;
    harness
        .run("lifecycle-inheritance-policy", |scenario| {
            let viewer = template_id(scenario.names(), "viewer");
            let admin = template_id(scenario.names(), "prtb-admin");
            let judy = user(scenario.names(), "judy");
            let project = project(scenario.names());
            let namespace = NamespaceName::new(scenario.names().issue("ns"));
            scenario.create_template(project_template(&viewer, &[read_pods()], &[]))?;
            scenario.create_template(project_template(&admin, &[manage_prtbs()], &[]))?;
            scenario.create_project(&cluster(), &project)?;
            scenario.create_namespace(&cluster(), &project, &namespace)?;
            let binding = project_binding(scenario.names(), &viewer, &judy, &project);
            scenario.bind(binding)?;
            scenario.await_convergence()?;
            assert_eq!(scenario.observed_counts(&judy)?.local, 0);

            scenario.set_inheritance(&viewer, vec![admin.clone()])?;
            scenario.await_convergence()?;
            scenario.verify_all()?;
            let counts = scenario.observed_counts(&judy)?;
            assert_eq!(counts.downstream, 1);
            local = Some(counts.local);
            Ok(())
        })
        .map_err(|err| err.to_string())?;
    local.ok_or_else(|| "scenario body did not record a count".to_string())
}

#[test]
fn deleting_a_template_removes_only_its_objects() -> TestResult {
    let report = RunSummary::start("template_deletion")?;
    let harness = SystemHarness::new()?;
    harness.run("lifecycle-delete", |scenario| {
        let lone = template_id(scenario.names(), "lone");
        let kept = template_id(scenario.names(), "kept");
        let kim = user(scenario.names(), "kim");
        scenario.create_template(cluster_template(&lone, &[read_pods()], &[]))?;
        scenario.create_template(cluster_template(&kept, &[write_configmaps()], &[]))?;
        let binding = cluster_binding(scenario.names(), &kept, &kim);
        let name = binding.name.clone();
        scenario.bind(binding)?;
        scenario.await_convergence()?;
        assert_eq!(scenario.observed_role_objects(&lone)?.len(), 4);

        scenario.delete_template(&lone)?;
        scenario.await_convergence()?;
        scenario.verify_all()?;
        assert!(scenario.observed_role_objects(&lone)?.is_empty());
        assert_eq!(scenario.observed_role_objects(&kept)?.len(), 4);
        let listed: Vec<_> =
            scenario.observed_bindings(&kim)?.into_iter().map(|binding| binding.name).collect();
        assert_eq!(listed, vec![name]);

        let downstream = ClusterRef::Downstream(cluster());
        let get_configmaps =
            ProbeRequest::new(downstream, ProbeVerb::Get, CORE_API_GROUP, "configmaps");
        scenario.expect_probe(&kim, &get_configmaps, ProbeOutcome::Allowed)?;
        Ok(())
    })?;
    report.passed(harness.audit().events().len())?;
    Ok(())
}

#[test]
fn unbinding_removes_grants_and_access() -> TestResult {
    let report = RunSummary::start("unbind")?;
    let harness = SystemHarness::new()?;
    harness.run("lifecycle-unbind", |scenario| {
        let owner = template_id(scenario.names(), "owner");
        let leo = user(scenario.names(), "leo");
        let project = project(scenario.names());
        let namespace = NamespaceName::new(scenario.names().issue("ns"));
        scenario.create_template(project_template(&owner, &[read_pods(), manage_prtbs()], &[]))?;
        scenario.create_project(&cluster(), &project)?;
        scenario.create_namespace(&cluster(), &project, &namespace)?;
        let binding = project_binding(scenario.names(), &owner, &leo, &project);
        let name = binding.name.clone();
        scenario.bind(binding)?;
        scenario.await_convergence()?;

        let list_pods = ProbeRequest::new(
            ClusterRef::Downstream(cluster()),
            ProbeVerb::List,
            CORE_API_GROUP,
            "pods",
        )
        .in_namespace(namespace.clone());
        scenario.expect_probe(&leo, &list_pods, ProbeOutcome::Allowed)?;
        assert_eq!(
            scenario.observed_counts(&leo)?,
            GrantCounts {
                local: 1,
                downstream: 1,
            }
        );

        scenario.unbind(&name)?;
        scenario.await_convergence()?;
        scenario.verify_grants(&leo)?;
        assert_eq!(scenario.observed_counts(&leo)?, GrantCounts::default());
        scenario.expect_probe(&leo, &list_pods, ProbeOutcome::Denied)?;
        Ok(())
    })?;
    report.passed(harness.audit().events().len())?;
    Ok(())
}

#[test]
fn inherited_templates_cannot_be_deleted() -> TestResult {
    let report = RunSummary::start("inherited_deletion")?;
    let harness = SystemHarness::new()?;
    harness.run("lifecycle-inherited", |scenario| {
        let parent = template_id(scenario.names(), "parent");
        let child = template_id(scenario.names(), "child");
        scenario.create_template(cluster_template(&parent, &[read_pods()], &[]))?;
        scenario.create_template(cluster_template(&child, &[], &[&parent]))?;
        let result = scenario.delete_template(&parent);
        assert!(
            matches!(
                result,
                Err(VerifierError::Model(ModelError::StillInherited { ref dependent, .. }))
                    if dependent == &child
            ),
            "unexpected result: {result:?}"
        );
        scenario.await_convergence()?;
        scenario.verify_template_rules(&child)?;
        Ok(())
    })?;
    report.passed(harness.audit().events().len())?;
    Ok(())
}

#[test]
fn template_deletion_policy_controls_remaining_grants() -> TestResult {
    let mut report = RunSummary::start("deletion_policy")?;
    assert_eq!(left_after_template_deletion(TemplateDeletionPolicy::RetainBindings)?, (1, 1));
    assert_eq!(left_after_template_deletion(TemplateDeletionPolicy::CascadeBindings)?, (0, 0));
    report.note("retain keeps the binding and its grant, cascade removes both");
    report.passed(0)?;
    Ok(())
}

#[test]
fn inheritance_policy_controls_local_grants() -> TestResult {
    let mut report = RunSummary::start("inheritance_policy")?;
    assert_eq!(local_grants_after_reparenting(InheritanceChangePolicy::KeepLocalGrants)?, 0);
    assert_eq!(local_grants_after_reparenting(InheritanceChangePolicy::RecomputeLocalGrants)?, 1);
    report.note("recompute adds the backing grant");
    report.passed(0)?;
    Ok(())
}
