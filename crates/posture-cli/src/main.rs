//! # posture CLI
//!
//! Evaluates a policy file against recorded check outcomes.
//!
//! Exit codes: 0 on PASS or NUDGE, 1 on FAIL, 2 on any error.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use posture_core::{
    resolve, EvaluationRequest, EvaluationResult, Observation, PolicyDocument, RequirementLevel,
    Status, Strategy,
};
use posture_runtime::{DispatchMode, OutcomeFixture, PolicyEvaluator, RuntimeConfig};

/// Posture compliance policy evaluator.
#[derive(Parser, Debug)]
#[command(name = "posture", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a policy against recorded outcomes
    Evaluate {
        /// Policy file (YAML, or JSON by extension)
        policy: PathBuf,

        /// Outcome fixture file mapping check names to outcomes
        #[arg(short, long)]
        outcomes: PathBuf,

        /// Evaluation strategy
        #[arg(short, long, value_enum, default_value = "fail-fast")]
        strategy: StrategyArg,

        /// Runtime config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Dispatch all checks at once
        #[arg(long)]
        concurrent: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Parse and schema-validate a policy file
    Validate {
        policy: PathBuf,
    },

    /// Print the resolution table
    Table,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    FailFast,
    Detailed,
    Versioned,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::FailFast => Strategy::FailFast,
            StrategyArg::Detailed => Strategy::Detailed,
            StrategyArg::Versioned => Strategy::Versioned,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Evaluate {
            policy,
            outcomes,
            strategy,
            config,
            concurrent,
            format,
        } => {
            evaluate(
                &policy,
                &outcomes,
                strategy.into(),
                config.as_deref(),
                concurrent,
                format,
            )
            .await
        }
        Commands::Validate { policy } => validate(&policy),
        Commands::Table => {
            print_table();
            Ok(ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

const EXIT_ERROR: u8 = 2;

/// Process exit status for an overall verdict.
fn exit_status(status: Status) -> u8 {
    match status {
        Status::Fail => 1,
        Status::Pass | Status::Nudge => 0,
    }
}

async fn evaluate(
    policy_path: &Path,
    outcomes_path: &Path,
    strategy: Strategy,
    config_path: Option<&Path>,
    concurrent: bool,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let result =
        run_evaluation(policy_path, outcomes_path, strategy, config_path, concurrent).await?;
    print_output(&result, format)?;
    Ok(ExitCode::from(exit_status(result.status())))
}

async fn run_evaluation(
    policy_path: &Path,
    outcomes_path: &Path,
    strategy: Strategy,
    config_path: Option<&Path>,
    concurrent: bool,
) -> anyhow::Result<EvaluationResult> {
    let policy = load_policy(policy_path)?;

    let fixture = OutcomeFixture::from_file(outcomes_path)
        .with_context(|| format!("Failed to load outcomes {}", outcomes_path.display()))?;

    let mut config = match config_path {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    if concurrent {
        config.dispatch = DispatchMode::Concurrent;
    }

    let evaluator = PolicyEvaluator::builder()
        .registry(fixture.into_registry())
        .config(config)
        .build()
        .context("Invalid runtime config")?;

    let request = EvaluationRequest::new(policy);
    evaluator
        .evaluate(strategy, &request)
        .await
        .with_context(|| format!("Evaluation of {} failed", policy_path.display()))
}

fn validate(policy_path: &Path) -> anyhow::Result<ExitCode> {
    let policy = load_policy(policy_path)?;
    println!("{}: valid ({} checks)", policy_path.display(), policy.len());
    Ok(ExitCode::SUCCESS)
}

fn load_policy(path: &Path) -> anyhow::Result<PolicyDocument> {
    let policy = PolicyDocument::from_file(path)
        .with_context(|| format!("Failed to load policy {}", path.display()))?;
    policy
        .validate_schema()
        .with_context(|| format!("Invalid policy {}", path.display()))?;
    tracing::debug!(policy = %path.display(), checks = policy.len(), "policy loaded");
    Ok(policy)
}

fn print_output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn print_table() {
    print!("{:<13}", "observed");
    for level in RequirementLevel::ALL {
        print!("{:<14}", level.as_str());
    }
    println!();

    for observation in Observation::ALL {
        print!("{:<13}", observation.to_string());
        for level in RequirementLevel::ALL {
            print!("{:<14}", format!("{:?}", resolve(observation, level)));
        }
        println!();
    }
}
