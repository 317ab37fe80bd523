// crates/rbac-harness-cli/src/main.rs
// ============================================================================
// Module: RBAC Harness CLI Entry Point
// Description: Command dispatcher for offline model queries and self-checks.
// Purpose: Expose aggregation, projection, inventory, and fan-out predictions.
// Dependencies: clap, role-aggregation, rbac-harness-config, rbac-harness-verifier.
// ============================================================================

//! ## Overview
//! The `rbac-harness` CLI answers model questions for a fixture file without
//! touching a platform: aggregated rules, placement projections, the
//! expected object inventory, and expected grant fan-out. `diff` compares two
//! rule sets, and `verify` runs a fixture as a scenario against the in-memory
//! reference platform. All user-facing strings go through the catalog.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use rbac_harness_cli::fixture::Fixture;
use rbac_harness_cli::fixture::FixtureError;
use rbac_harness_cli::fixture::RuleSetFixture;
use rbac_harness_cli::fixture::load_fixture;
use rbac_harness_cli::t;
use rbac_harness_config::HarnessConfig;
use rbac_harness_verifier::MemoryPlatform;
use rbac_harness_verifier::MemoryPlatformOptions;
use rbac_harness_verifier::ScenarioSettings;
use rbac_harness_verifier::build_audit_sink;
use rbac_harness_verifier::compare::compare_rules;
use rbac_harness_verifier::run_scenario;
use role_aggregation::Aggregator;
use role_aggregation::BindingSnapshot;
use role_aggregation::ExpectedGrant;
use role_aggregation::FanoutModel;
use role_aggregation::GrantCounts;
use role_aggregation::ModelError;
use role_aggregation::ObjectInventory;
use role_aggregation::Placement;
use role_aggregation::Principal;
use role_aggregation::Projector;
use role_aggregation::RoleTemplate;
use role_aggregation::RoleTemplateId;
use role_aggregation::RuleSet;
use role_aggregation::TemplateArena;
use role_aggregation::canonical_json_bytes;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "rbac-harness", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the aggregated rules of fixture templates.
    Aggregate(AggregateCommand),
    /// Print the projection of one template into one placement.
    Project(ProjectCommand),
    /// Print every role object the fixture's templates materialize.
    Inventory(InventoryCommand),
    /// Print the grants the fixture's bindings materialize.
    Fanout(FanoutCommand),
    /// Compare an expected and an actual rule set.
    Diff(DiffCommand),
    /// Run the fixture as a scenario against the in-memory platform.
    Verify(VerifyCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate an rbac-harness configuration file.
    Validate(ConfigValidateCommand),
}

/// Fixture and config inputs shared by model commands.
#[derive(Args, Debug)]
struct ModelInputArgs {
    /// Fixture file (`.json` or `.toml`).
    #[arg(long, value_name = "PATH")]
    fixture: PathBuf,
    /// Optional config file supplying the catalog and policies.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Output formats for structured commands.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Canonical JSON output.
    Json,
    /// Human-readable text output.
    Text,
}

/// Arguments for `aggregate`.
#[derive(Args, Debug)]
struct AggregateCommand {
    /// Fixture and config inputs.
    #[command(flatten)]
    input: ModelInputArgs,
    /// Limit output to one template.
    #[arg(long, value_name = "ID")]
    template: Option<String>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

/// Placement selector for `project`.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum PlacementArg {
    /// Management cluster.
    Local,
    /// Downstream clusters.
    Downstream,
}

impl From<PlacementArg> for Placement {
    fn from(value: PlacementArg) -> Self {
        match value {
            PlacementArg::Local => Self::Local,
            PlacementArg::Downstream => Self::Downstream,
        }
    }
}

/// Arguments for `project`.
#[derive(Args, Debug)]
struct ProjectCommand {
    /// Fixture and config inputs.
    #[command(flatten)]
    input: ModelInputArgs,
    /// Template to project.
    #[arg(long, value_name = "ID")]
    template: String,
    /// Placement to project into.
    #[arg(long, value_enum, default_value_t = PlacementArg::Local)]
    placement: PlacementArg,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

/// Arguments for `inventory`.
#[derive(Args, Debug)]
struct InventoryCommand {
    /// Fixture and config inputs.
    #[command(flatten)]
    input: ModelInputArgs,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

/// Arguments for `fanout`.
#[derive(Args, Debug)]
struct FanoutCommand {
    /// Fixture and config inputs.
    #[command(flatten)]
    input: ModelInputArgs,
    /// Limit output to one principal (`user:NAME` or `group:NAME`).
    #[arg(long, value_name = "PRINCIPAL", value_parser = parse_principal)]
    principal: Option<Principal>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

/// Arguments for `diff`.
#[derive(Args, Debug)]
struct DiffCommand {
    /// Expected rule set file.
    #[arg(long, value_name = "PATH")]
    expected: PathBuf,
    /// Actual rule set file.
    #[arg(long, value_name = "PATH")]
    actual: PathBuf,
}

/// Arguments for `verify`.
#[derive(Args, Debug)]
struct VerifyCommand {
    /// Fixture and config inputs.
    #[command(flatten)]
    input: ModelInputArgs,
    /// Reads the in-memory platform serves stale after each change.
    #[arg(long, value_name = "COUNT", default_value_t = 1)]
    settle_reads: u32,
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to rbac-harness.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for catalog messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a catalog message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

impl From<ModelError> for CliError {
    fn from(error: ModelError) -> Self {
        Self::new(t!("model.failed", error = error))
    }
}

impl From<FixtureError> for CliError {
    fn from(error: FixtureError) -> Self {
        let message = match error {
            FixtureError::Io {
                path,
                error,
            } => t!("fixture.read_failed", path = path, error = error),
            FixtureError::TooLarge {
                path,
                size,
                limit,
            } => t!("fixture.too_large", path = path, size = size, limit = limit),
            FixtureError::UnknownFormat {
                path,
            } => t!("fixture.unknown_format", path = path),
            FixtureError::Parse {
                path,
                error,
            } => t!("fixture.parse_failed", path = path, error = error),
        };
        Self::new(message)
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Aggregate(command) => command_aggregate(&command),
        Commands::Project(command) => command_project(&command),
        Commands::Inventory(command) => command_inventory(&command),
        Commands::Fanout(command) => command_fanout(&command),
        Commands::Diff(command) => command_diff(&command),
        Commands::Verify(command) => command_verify(&command),
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate(command) => command_config_validate(&command),
        },
    }
}

/// Prints the top-level help.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("")
}

// ============================================================================
// SECTION: Model Commands
// ============================================================================

/// Executes `aggregate`.
fn command_aggregate(command: &AggregateCommand) -> CliResult<ExitCode> {
    let (fixture, _config) = load_inputs(&command.input)?;
    let arena = fixture.arena()?;
    let report = aggregate_report(&arena, command.template.as_deref())?;
    match command.format {
        OutputFormat::Json => write_canonical_json(&report)?,
        OutputFormat::Text => {
            for (id, rules) in &report {
                write_stdout_line(&format!("{id}: {} grants", rules.len()))?;
                write_rules_text(rules)?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `project`.
fn command_project(command: &ProjectCommand) -> CliResult<ExitCode> {
    let (fixture, config) = load_inputs(&command.input)?;
    let arena = fixture.arena()?;
    let catalog = config.catalog.to_catalog();
    let id = RoleTemplateId::new(command.template.as_str());
    require_template(&arena, &id)?;
    let projection = Projector::new(&arena, &catalog).project(&id, command.placement.into())?;
    match command.format {
        OutputFormat::Json => write_canonical_json(&projection)?,
        OutputFormat::Text => {
            for role in projection.roles() {
                let line =
                    format!("{} {}: {} grants", role.placement, role.kind, role.rules.len());
                write_stdout_line(&line)?;
                write_rules_text(&role.rules)?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `inventory`.
fn command_inventory(command: &InventoryCommand) -> CliResult<ExitCode> {
    let (fixture, config) = load_inputs(&command.input)?;
    let arena = fixture.arena()?;
    let catalog = config.catalog.to_catalog();
    let mut inventory = ObjectInventory::new(Projector::new(&arena, &catalog));
    let objects = inventory.all_objects(&fixture.downstream)?;
    match command.format {
        OutputFormat::Json => write_canonical_json(&objects)?,
        OutputFormat::Text => {
            for object in &objects {
                let line =
                    format!("{} {} ({} grants)", object.cluster, object.name, object.rules.len());
                write_stdout_line(&line)?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Expected fan-out of one principal.
#[derive(Debug, Serialize)]
struct PrincipalReport {
    /// Principal.
    principal: Principal,
    /// Local and downstream grant counts.
    counts: GrantCounts,
    /// Expected grants in canonical order.
    grants: Vec<ExpectedGrant>,
}

/// Executes `fanout`.
fn command_fanout(command: &FanoutCommand) -> CliResult<ExitCode> {
    let (fixture, config) = load_inputs(&command.input)?;
    let reports = fanout_report(&fixture, &config, command.principal.as_ref())?;
    match command.format {
        OutputFormat::Json => write_canonical_json(&reports)?,
        OutputFormat::Text => {
            for report in &reports {
                write_stdout_line(&format!(
                    "{}: {} local, {} downstream",
                    report.principal, report.counts.local, report.counts.downstream
                ))?;
                for grant in &report.grants {
                    write_stdout_line(&format!("  {grant}"))?;
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `diff`.
fn command_diff(command: &DiffCommand) -> CliResult<ExitCode> {
    let expected: RuleSetFixture = load_fixture(&command.expected)?;
    let actual: RuleSetFixture = load_fixture(&command.actual)?;
    match compare_rules("rules", &expected.rules, &actual.rules) {
        Ok(()) => {
            write_stdout_line(&t!("diff.match", count = expected.rules.len()))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(mismatch) => {
            write_stdout_line(&t!("diff.mismatch", details = mismatch))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes `verify`.
fn command_verify(command: &VerifyCommand) -> CliResult<ExitCode> {
    let (fixture, config) = load_inputs(&command.input)?;
    let arena = fixture.arena()?;
    let audit = build_audit_sink(&config.audit)
        .map_err(|err| CliError::new(t!("audit.open_failed", error = err)))?;
    let platform = MemoryPlatform::new(
        MemoryPlatformOptions::new(fixture.downstream.iter().cloned())
            .with_catalog(config.catalog.to_catalog())
            .with_policy(config.policy)
            .with_settle_reads(command.settle_reads),
    );
    let name = scenario_name(&command.input.fixture);
    let settings = ScenarioSettings::from_config(&config);
    let outcome = run_scenario(&name, &platform, settings, audit, |scenario| {
        for template in creation_order(&arena) {
            scenario.create_template(template)?;
        }
        for project in &fixture.projects {
            scenario.create_project(&project.cluster, &project.project)?;
            for namespace in &project.namespaces {
                scenario.create_namespace(&project.cluster, &project.project, namespace)?;
            }
        }
        for binding in &fixture.bindings {
            scenario.bind(binding.clone())?;
        }
        scenario.await_convergence()?;
        scenario.verify_all()
    });
    match outcome {
        Ok(report) => {
            let message = t!("verify.ok", scenario = report.scenario, count = report.torn_down);
            write_stdout_line(&message)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            write_stderr_line(&t!("verify.failed", error = failure))?;
            for leftover in &failure.teardown_failures {
                write_stderr_line(&t!("verify.teardown_failed", resource = leftover))?;
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = HarnessConfig::load_with_env(command.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    write_stdout_line(&t!("config.validate.ok"))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Model Helpers
// ============================================================================

/// Loads the fixture and the config (defaults when no path is given).
fn load_inputs(input: &ModelInputArgs) -> CliResult<(Fixture, HarnessConfig)> {
    let fixture: Fixture = load_fixture(&input.fixture)?;
    let config = match &input.config {
        Some(path) => HarnessConfig::load_with_env(Some(path.as_path()))
            .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?,
        None => HarnessConfig::default(),
    };
    Ok((fixture, config))
}

/// Fails when `id` is not part of the fixture.
fn require_template(arena: &TemplateArena, id: &RoleTemplateId) -> CliResult<()> {
    if arena.contains(id) {
        Ok(())
    } else {
        Err(CliError::new(t!("model.unknown_template", id = id)))
    }
}

/// Aggregates one template or every template in the arena.
fn aggregate_report(
    arena: &TemplateArena,
    only: Option<&str>,
) -> CliResult<BTreeMap<RoleTemplateId, RuleSet>> {
    let mut aggregator = Aggregator::new(arena);
    let ids: Vec<RoleTemplateId> = match only {
        Some(id) => {
            let id = RoleTemplateId::new(id);
            require_template(arena, &id)?;
            vec![id]
        }
        None => arena.iter().map(|template| template.id.clone()).collect(),
    };
    let mut out = BTreeMap::new();
    for id in ids {
        let rules = aggregator.aggregate(&id)?;
        out.insert(id, rules);
    }
    Ok(out)
}

/// Computes the expected fan-out of every bound principal.
fn fanout_report(
    fixture: &Fixture,
    config: &HarnessConfig,
    only: Option<&Principal>,
) -> CliResult<Vec<PrincipalReport>> {
    let arena = fixture.arena()?;
    let catalog = config.catalog.to_catalog();
    let directory = fixture.directory();
    let mut model = FanoutModel::new(Projector::new(&arena, &catalog), &directory, config.policy);
    let snapshots = fixture
        .bindings
        .iter()
        .map(|binding| model.snapshot(binding))
        .collect::<Result<Vec<BindingSnapshot>, ModelError>>()?;
    let principals: BTreeSet<Principal> = match only {
        Some(principal) => BTreeSet::from([principal.clone()]),
        None => fixture.principals(),
    };
    let mut reports = Vec::with_capacity(principals.len());
    for principal in principals {
        let fanout = model.principal_fanout(&principal, &snapshots)?;
        reports.push(PrincipalReport {
            counts: fanout.counts(),
            grants: fanout.grants(),
            principal,
        });
    }
    Ok(reports)
}

/// Orders templates so every parent is created before its children.
///
/// Templates that can never become ready are appended last so creation
/// reports the model error.
fn creation_order(arena: &TemplateArena) -> Vec<RoleTemplate> {
    let mut created: BTreeSet<RoleTemplateId> = BTreeSet::new();
    let mut order = Vec::with_capacity(arena.len());
    let mut remaining: Vec<&RoleTemplate> = arena.iter().collect();
    while !remaining.is_empty() {
        let (ready, blocked): (Vec<&RoleTemplate>, Vec<&RoleTemplate>) = remaining
            .into_iter()
            .partition(|template| template.inherited.iter().all(|parent| created.contains(parent)));
        if ready.is_empty() {
            order.extend(blocked.into_iter().cloned());
            break;
        }
        for template in ready {
            created.insert(template.id.clone());
            order.push(template.clone());
        }
        remaining = blocked;
    }
    order
}

/// Parses `user:NAME` or `group:NAME`.
fn parse_principal(value: &str) -> Result<Principal, String> {
    match value.split_once(':') {
        Some(("user", name)) if !name.is_empty() => Ok(Principal::User(name.to_string())),
        Some(("group", name)) if !name.is_empty() => Ok(Principal::Group(name.to_string())),
        _ => Err(format!("expected user:NAME or group:NAME, got {value}")),
    }
}

/// Derives a scenario name from the fixture file stem.
fn scenario_name(path: &Path) -> String {
    path.file_stem().and_then(|stem| stem.to_str()).unwrap_or("fixture").to_string()
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> CliResult<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}").map_err(|err| CliError::new(output_error("stderr", &err)))
}

/// Writes canonical JSON to stdout followed by a newline.
fn write_canonical_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut bytes = canonical_json_bytes(value)
        .map_err(|err| CliError::new(t!("output.serialize_failed", error = err)))?;
    bytes.push(b'\n');
    let mut stdout = std::io::stdout();
    stdout.write_all(&bytes).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes one compact JSON line per grant.
fn write_rules_text(rules: &RuleSet) -> CliResult<()> {
    for grant in rules {
        let line = serde_json::to_string(grant)
            .map_err(|err| CliError::new(t!("output.serialize_failed", error = err)))?;
        write_stdout_line(&format!("  {line}"))?;
    }
    Ok(())
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
