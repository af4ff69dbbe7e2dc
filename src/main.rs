//! Gateway reconciler CLI entrypoint.
//!
//! Reads a parameter file, converges one API and reports the outcome on
//! stdout. Logs go to stderr.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use gravitee_gateway::cli::{Cli, Commands, OutputFormatter};
use gravitee_gateway::config::{find_params_file, ConfigParser, Invocation, ModuleParams, ParamsValidator};
use gravitee_gateway::error::Result;
use gravitee_gateway::gateway::GatewayClient;
use gravitee_gateway::reconciler::{Outcome, Reconciler};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_json);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system on stderr.
fn init_logging(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<ExitCode> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Validate { warnings } => cmd_validate(cli.params.as_ref(), warnings, &formatter),
        Commands::Plan => cmd_plan(cli.params.as_ref(), &formatter).await,
        Commands::Apply { check } => cmd_apply(cli.params.as_ref(), check, &formatter).await,
    }
}

/// Validate the parameter file.
fn cmd_validate(
    params_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let params = load_params(params_path)?;
    let (_, result) = ParamsValidator::new().check(&params)?;

    emit(&formatter.format_validation(&result, show_warnings))?;
    Ok(if result.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Show the action plan without writing anything.
async fn cmd_plan(params_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<ExitCode> {
    let invocation = load_invocation(params_path)?;
    let client = GatewayClient::new(&invocation.connection)?;

    let run = Reconciler::new(client)
        .with_check_mode(true)
        .reconcile(&invocation)
        .await;

    match &run.plan {
        Some(plan) => emit(&formatter.format_plan(plan))?,
        None => emit(&formatter.format_outcome(&run.outcome))?,
    }
    Ok(exit_code(&run.outcome))
}

/// Converge the API.
async fn cmd_apply(
    params_path: Option<&PathBuf>,
    check: bool,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let outcome = match load_invocation(params_path) {
        Ok(invocation) => apply(&invocation, check).await,
        Err(e) => Outcome::from_error(&e),
    };

    emit(&formatter.format_outcome(&outcome))?;
    Ok(exit_code(&outcome))
}

async fn apply(invocation: &Invocation, check: bool) -> Outcome {
    let client = match GatewayClient::new(&invocation.connection) {
        Ok(client) => client,
        Err(e) => return Outcome::from_error(&e),
    };

    let run = Reconciler::new(client)
        .with_check_mode(check)
        .reconcile(invocation)
        .await;
    if let Some(plan) = &run.plan {
        debug!("{plan}");
    }
    run.outcome
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the parameter file path.
fn resolve_params_path(params_path: Option<&PathBuf>) -> Result<PathBuf> {
    params_path.map_or_else(|| find_params_file("."), |path| Ok(path.clone()))
}

/// Loads the parameter document, with `.env` and environment fallbacks.
fn load_params(params_path: Option<&PathBuf>) -> Result<ModuleParams> {
    let params_file = resolve_params_path(params_path)?;
    debug!("Loading parameters from: {}", params_file.display());

    let parser = ConfigParser::new().with_base_path(params_file.parent().unwrap_or_else(|| Path::new(".")));
    parser.load_dotenv()?;
    parser.load_with_env(&params_file)
}

/// Loads and validates the parameters.
fn load_invocation(params_path: Option<&PathBuf>) -> Result<Invocation> {
    let params = load_params(params_path)?;
    let invocation = ParamsValidator::new().validate(&params)?;
    info!("Parameters validated ({} auth)", invocation.credentials.strategy());
    Ok(invocation)
}

/// Writes command output to stdout.
fn emit(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", output.trim_end())?;
    stdout.flush()?;
    Ok(())
}

const fn exit_code(outcome: &Outcome) -> ExitCode {
    if outcome.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
