//! wmatch CLI - Command-line interface for Workout Match
//!
//! Commands:
//! - flatten: Expand a plan into its flat execution sequence
//! - align: Map recorded laps onto a plan's flat steps
//! - score: Produce the full plan-vs-actual report
//! - validate: Report authoring problems in a plan
//! - config: Print the effective scoring configuration

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use workout_match::adapters::adapter_for;
use workout_match::schema::{parse_plan, validate_plan};
use workout_match::{align, flatten, MatchError, ScoringConfig, WorkoutMatcher, WORKOUT_MATCH_VERSION};

/// wmatch - Compare recorded laps with structured workout plans
#[derive(Parser)]
#[command(name = "wmatch")]
#[command(version = WORKOUT_MATCH_VERSION)]
#[command(about = "Flatten workout plans and score recorded activities against them", long_about = None)]
struct Cli {
    /// Increase log verbosity (logs go to stderr; RUST_LOG overrides)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand a plan into its flat execution sequence
    Flatten {
        /// Plan file path (use - for stdin)
        #[arg(short, long)]
        plan: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Map recorded laps onto a plan's flat steps
    Align {
        #[command(flatten)]
        input: MatchInputArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Produce the full plan-vs-actual report
    Score {
        #[command(flatten)]
        input: MatchInputArgs,

        #[command(flatten)]
        scoring: ScoringArgs,

        /// Fixed producer instance ID for reproducible reports
        #[arg(long)]
        instance_id: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Report authoring problems in a plan
    Validate {
        /// Plan file path (use - for stdin)
        #[arg(short, long)]
        plan: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective scoring configuration
    Config {
        #[command(flatten)]
        scoring: ScoringArgs,
    },
}

#[derive(Args)]
struct MatchInputArgs {
    /// Plan file path (use - for stdin)
    #[arg(short, long)]
    plan: PathBuf,

    /// Activity file path (use - for stdin)
    #[arg(short, long)]
    activity: PathBuf,

    /// Activity JSON source format
    #[arg(long, value_enum, default_value = "native")]
    source: Source,
}

#[derive(Args)]
struct ScoringArgs {
    /// Load scoring configuration from a JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Points lost per percent of deviation
    #[arg(long)]
    sensitivity: Option<f64>,

    /// Weight of the objective metric (0-1)
    #[arg(long)]
    objective_weight: Option<f64>,
}

#[derive(Args)]
struct OutputArgs {
    /// Output file path (use - for stdout)
    #[arg(short, long, default_value = "-")]
    output: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "json-pretty")]
    output_format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum Source {
    /// Workout Match activity JSON (laps + optional totals, or a bare lap array)
    Native,
    /// Strava detailed-activity JSON with laps
    Strava,
}

impl Source {
    fn as_str(&self) -> &'static str {
        match self {
            Source::Native => "native",
            Source::Strava => "strava",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = if verbose > 0 { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(command: Commands) -> Result<(), WmatchCliError> {
    match command {
        Commands::Flatten { plan, output } => cmd_flatten(&plan, &output),
        Commands::Align { input, output } => cmd_align(&input, &output),
        Commands::Score {
            input,
            scoring,
            instance_id,
            output,
        } => cmd_score(&input, &scoring, instance_id, &output),
        Commands::Validate { plan, json } => cmd_validate(&plan, json),
        Commands::Config { scoring } => cmd_config(&scoring),
    }
}

fn cmd_flatten(plan_path: &Path, output: &OutputArgs) -> Result<(), WmatchCliError> {
    let plan = parse_plan(&read_input(plan_path)?)?;
    let flat_steps = flatten(&plan);
    debug!(step_count = flat_steps.len(), "Flattened plan");

    write_output(&flat_steps, output)
}

fn cmd_align(input: &MatchInputArgs, output: &OutputArgs) -> Result<(), WmatchCliError> {
    let plan = parse_plan(&read_input(&input.plan)?)?;
    let activity = adapter_for(input.source.as_str())?.parse(&read_input(&input.activity)?)?;

    let flat_steps = flatten(&plan);
    let matched_laps = align(&activity.laps, &flat_steps);

    write_output(&matched_laps, output)
}

fn cmd_score(
    input: &MatchInputArgs,
    scoring: &ScoringArgs,
    instance_id: Option<String>,
    output: &OutputArgs,
) -> Result<(), WmatchCliError> {
    let config = load_config(scoring)?;
    let mut matcher = WorkoutMatcher::with_config(config)?;
    if let Some(instance_id) = instance_id {
        matcher = matcher.with_instance_id(instance_id);
    }

    let plan = parse_plan(&read_input(&input.plan)?)?;
    let activity = adapter_for(input.source.as_str())?.parse(&read_input(&input.activity)?)?;

    let report = matcher.report(&plan, &activity);
    if !report.matched {
        warn!("Plan has no planned distance or duration, nothing to compare");
    }

    write_output(&report, output)
}

fn cmd_validate(plan_path: &Path, json: bool) -> Result<(), WmatchCliError> {
    let plan = parse_plan(&read_input(plan_path)?)?;
    let results = validate_plan(&plan);

    let report = ValidationReport {
        total_entries: plan.len(),
        flat_step_count: flatten(&plan).len(),
        issue_count: results.len(),
        issues: results
            .iter()
            .map(|r| ValidationIssueDetail {
                entry_index: r.entry_index,
                message: r.issue.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Plan Validation Report");
        println!("======================");
        println!("Plan entries: {}", report.total_entries);
        println!("Flat steps:   {}", report.flat_step_count);
        println!("Issues:       {}", report.issue_count);

        if !report.issues.is_empty() {
            println!("\nIssues:");
            for issue in &report.issues {
                println!("  - Entry {}: {}", issue.entry_index, issue.message);
            }
        }
    }

    if report.issue_count > 0 {
        Err(WmatchCliError::ValidationFailed(report.issue_count))
    } else {
        Ok(())
    }
}

fn cmd_config(scoring: &ScoringArgs) -> Result<(), WmatchCliError> {
    let config = load_config(scoring)?;
    println!("{}", config.to_json()?);
    Ok(())
}

// Helper functions

fn load_config(scoring: &ScoringArgs) -> Result<ScoringConfig, WmatchCliError> {
    let mut config = match &scoring.config {
        Some(path) => ScoringConfig::from_json(&fs::read_to_string(path)?)?,
        None => ScoringConfig::default(),
    };

    if let Some(sensitivity) = scoring.sensitivity {
        config.sensitivity = sensitivity;
    }
    if let Some(weight) = scoring.objective_weight {
        config.objective_weight = weight;
    }

    config.validate()?;
    Ok(config)
}

fn read_input(path: &Path) -> Result<String, WmatchCliError> {
    if path.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            warn!("Reading input from the terminal, finish with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn write_output<T: Serialize>(value: &T, output: &OutputArgs) -> Result<(), WmatchCliError> {
    let data = match output.output_format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value)?,
    };

    if output.output.to_string_lossy() == "-" {
        println!("{}", data);
    } else {
        fs::write(&output.output, data + "\n")?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum WmatchCliError {
    Io(io::Error),
    Match(MatchError),
    Json(serde_json::Error),
    ValidationFailed(usize),
}

impl From<io::Error> for WmatchCliError {
    fn from(e: io::Error) -> Self {
        WmatchCliError::Io(e)
    }
}

impl From<MatchError> for WmatchCliError {
    fn from(e: MatchError) -> Self {
        WmatchCliError::Match(e)
    }
}

impl From<serde_json::Error> for WmatchCliError {
    fn from(e: serde_json::Error) -> Self {
        WmatchCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<WmatchCliError> for CliError {
    fn from(e: WmatchCliError) -> Self {
        match e {
            WmatchCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            WmatchCliError::Match(MatchError::InvalidConfig(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'wmatch config' to see the defaults".to_string()),
            },
            WmatchCliError::Match(MatchError::UnsupportedSource(source)) => CliError {
                code: "UNSUPPORTED_SOURCE".to_string(),
                message: format!("Unsupported activity source: {}", source),
                hint: Some("Use --source native or --source strava".to_string()),
            },
            WmatchCliError::Match(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure the plan and activity JSON match the expected shape".to_string()),
            },
            WmatchCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            WmatchCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} plan issues found", count),
                hint: Some("The engine tolerates these issues, but the plan may not be what was intended".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct ValidationReport {
    total_entries: usize,
    flat_step_count: usize,
    issue_count: usize,
    issues: Vec<ValidationIssueDetail>,
}

#[derive(Serialize)]
struct ValidationIssueDetail {
    entry_index: usize,
    message: String,
}
