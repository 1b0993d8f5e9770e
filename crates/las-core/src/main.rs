//! las-core: large action space exploration from the command line.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use las_common::{ActionBatch, Error, Result, SCHEMA_VERSION};
use las_config::{resolve_config, ConfigSnapshot, ResolveError, ResolvedConfig};
use las_core::simulate::{SimulationParams, SimulationReport, Simulator};
use las_core::{ExitCode, KernelBackend, Prediction, Workspace};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Environment variable holding the log filter.
const LOG_ENV_VAR: &str = "LAS_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "las-core",
    version,
    about = "Spanner-restricted exploration for contextual bandits with large action sets"
)]
struct Cli {
    /// Configuration file (JSON or TOML); overrides LAS_CONFIG and the XDG location
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log output format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute exploration distributions for a file of batches
    Predict {
        /// JSON array of action batches
        #[arg(long, value_name = "FILE")]
        batch: PathBuf,
        /// Update the regressor from labelled batches after predicting
        #[arg(long)]
        learn: bool,
    },
    /// Run synthetic rounds against a hidden linear cost model
    Simulate {
        #[arg(long, default_value = "100")]
        rounds: usize,
        #[arg(long, default_value = "50")]
        actions: usize,
        /// Features per action
        #[arg(long, default_value = "4")]
        features: usize,
        #[arg(long, default_value = "0")]
        seed: u64,
    },
    /// Inspect the resolved configuration
    Config(ConfigArgs),
    /// Show the dot-product kernel selected on this CPU
    Kernel,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the resolved configuration with its source and hash
    Show,
    /// Validate the resolved configuration and list every problem
    Validate,
    /// Print the JSON schema of the configuration file
    Schema,
}

// ── Reports ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct RunHeader {
    schema_version: &'static str,
    run_id: Uuid,
    generated_at: DateTime<Utc>,
    config_source: String,
    config_hash: String,
}

impl RunHeader {
    fn new(snapshot: &ConfigSnapshot) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            config_source: snapshot.source.clone(),
            config_hash: snapshot.hash.clone(),
        }
    }
}

#[derive(Serialize)]
struct PredictReport {
    #[serde(flatten)]
    header: RunHeader,
    rounds: Vec<Prediction>,
}

#[derive(Serialize)]
struct SimulateReport {
    #[serde(flatten)]
    header: RunHeader,
    #[serde(flatten)]
    simulation: SimulationReport,
}

#[derive(Serialize)]
struct KernelReport {
    detected: KernelBackend,
    configured: KernelBackend,
    avx512_compiled: bool,
}

#[derive(Serialize)]
struct ValidationOutput {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    errors: Vec<FieldProblem>,
}

#[derive(Serialize)]
struct FieldProblem {
    field: &'static str,
    message: String,
}

// ── Entry point ─────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let code = match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            error!(code = err.code(), "{err}");
            eprintln!("las-core: {err}");
            ExitCode::from(&err)
        }
    };
    std::process::exit(code.as_i32());
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(err) = installed {
        eprintln!("las-core: logging disabled: {err}");
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = cli.config.as_deref();
    match &cli.command {
        Commands::Predict { batch, learn } => run_predict(config, batch, *learn),
        Commands::Simulate {
            rounds,
            actions,
            features,
            seed,
        } => run_simulate(
            config,
            SimulationParams {
                rounds: *rounds,
                actions: *actions,
                features: *features,
                seed: *seed,
            },
        ),
        Commands::Config(args) => match args.command {
            ConfigCommands::Show => run_config_show(config),
            ConfigCommands::Validate => run_config_validate(config),
            ConfigCommands::Schema => {
                print_json(&las_config::LasConfig::json_schema())?;
                Ok(ExitCode::Clean)
            }
        },
        Commands::Kernel => run_kernel(config),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load(config: Option<&Path>) -> Result<ResolvedConfig> {
    let resolved = resolve_config(config)?;
    info!(source = %resolved.source, "configuration resolved");
    Ok(resolved)
}

fn read_batches(path: &Path) -> Result<Vec<ActionBatch>> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| Error::InvalidBatch(format!("{}: {e}", path.display())))
}

// ── Commands ────────────────────────────────────────────────────────────

fn run_predict(config: Option<&Path>, batch_path: &Path, learn: bool) -> Result<ExitCode> {
    let resolved = load(config)?;
    let snapshot = ConfigSnapshot::capture(&resolved);
    let batches = read_batches(batch_path)?;
    let mut workspace = Workspace::new(resolved.config)?;

    let mut rounds = Vec::with_capacity(batches.len());
    for (round, batch) in batches.iter().enumerate() {
        let prediction = if learn {
            workspace.learn(batch)?
        } else {
            workspace.predict(batch)?
        };
        info!(
            round,
            actions = batch.action_count(),
            spanner = prediction.outcome.spanner.len(),
            "round predicted"
        );
        rounds.push(prediction);
    }

    print_json(&PredictReport {
        header: RunHeader::new(&snapshot),
        rounds,
    })?;
    Ok(ExitCode::Clean)
}

fn run_simulate(config: Option<&Path>, params: SimulationParams) -> Result<ExitCode> {
    if params.actions == 0 {
        return Err(Error::InvalidBatch("--actions must be at least 1".to_string()));
    }
    let resolved = load(config)?;
    let snapshot = ConfigSnapshot::capture(&resolved);
    let mut workspace = Workspace::new(resolved.config)?;
    let simulation = Simulator::new(params).run(&mut workspace)?;
    info!(
        rounds = simulation.rounds,
        mean_cost = simulation.mean_cost,
        recent_mean_cost = simulation.recent_mean_cost,
        "simulation finished"
    );
    print_json(&SimulateReport {
        header: RunHeader::new(&snapshot),
        simulation,
    })?;
    Ok(ExitCode::Clean)
}

fn run_config_show(config: Option<&Path>) -> Result<ExitCode> {
    let resolved = load(config)?;
    print_json(&ConfigSnapshot::capture(&resolved))?;
    Ok(ExitCode::Clean)
}

fn run_config_validate(config: Option<&Path>) -> Result<ExitCode> {
    match resolve_config(config) {
        Ok(resolved) => {
            print_json(&ValidationOutput {
                valid: true,
                source: Some(resolved.source.to_string()),
                errors: Vec::new(),
            })?;
            Ok(ExitCode::Clean)
        }
        Err(ResolveError::Invalid(report)) => {
            print_json(&ValidationOutput {
                valid: false,
                source: None,
                errors: report
                    .errors
                    .into_iter()
                    .map(|e| FieldProblem {
                        field: e.field,
                        message: e.message,
                    })
                    .collect(),
            })?;
            Ok(ExitCode::ConfigError)
        }
        Err(other) => Err(other.into()),
    }
}

fn run_kernel(config: Option<&Path>) -> Result<ExitCode> {
    let resolved = load(config)?;
    print_json(&KernelReport {
        detected: KernelBackend::detect(),
        configured: KernelBackend::from_hint(resolved.config.simd),
        avx512_compiled: cfg!(feature = "avx512"),
    })?;
    Ok(ExitCode::Clean)
}
