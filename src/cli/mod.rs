//! CLI surface: one subcommand per named CLI action, returning the exit
//! codes 0 (success), 2 (validation failure), 3 (sandbox unavailable), and
//! 4 (misconfiguration).

use crate::champion_tracker::ChampionTracker;
use crate::config::Config;
use crate::diversity::DiversityMonitor;
use crate::executor::IterationExecutor;
use crate::field_manifest::FieldManifest;
use crate::history::IterationHistory;
use crate::proposer::MockProposer;
use crate::sandbox::{SandboxExecutor, SandboxRegistry};
use crate::alerts::AlertManager;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_VALIDATION_FAILURE: i32 = 2;
pub const EXIT_SANDBOX_UNAVAILABLE: i32 = 3;
pub const EXIT_MISCONFIGURATION: i32 = 4;

#[derive(Parser, Debug)]
#[command(name = "strataloop", author, version, about = "Autonomous strategy iteration engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the YAML configuration file.
    #[arg(long, global = true, default_value = "strataloop.yaml")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an iteration stream with the given config.
    Run {
        /// Number of iterations to run before exiting.
        #[arg(long, default_value_t = 10)]
        iterations: u64,
        /// Sweep orphaned sandbox scratch dirs and exit, without iterating.
        #[arg(long, default_value_t = false)]
        cleanup_only: bool,
    },
    /// Print the current champion and the last N recorded outcomes.
    Status {
        #[arg(long, default_value_t = 10)]
        last: usize,
    },
    /// Atomically replace the champion with a prior iteration's result.
    Rollback {
        #[arg(long = "to")]
        to: u64,
    },
    /// Run the Static Validator against a file and exit non-zero on violations.
    Validate {
        file: PathBuf,
    },
}

pub async fn dispatch(cli: Cli) -> i32 {
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return EXIT_MISCONFIGURATION;
        }
    };

    match cli.command {
        Command::Run { iterations, cleanup_only } => run(&config, iterations, cleanup_only).await,
        Command::Status { last } => status(&config, last),
        Command::Rollback { to } => rollback(&config, to),
        Command::Validate { file } => validate(&config, &file),
    }
}

fn load_field_manifest(config: &Config) -> Result<FieldManifest, i32> {
    FieldManifest::load(&config.field_manifest.path).map_err(|e| {
        tracing::error!(error = %e, "failed to load field manifest");
        EXIT_MISCONFIGURATION
    })
}

async fn run(config: &Config, iterations: u64, cleanup_only: bool) -> i32 {
    let sandbox = SandboxExecutor::new(config.sandbox.clone(), SandboxRegistry::new());
    if let Err(e) = sandbox.cleanup_sweep() {
        tracing::warn!(error = %e, "startup sandbox cleanup sweep failed");
    }
    if cleanup_only {
        return EXIT_SUCCESS;
    }

    let manifest = match load_field_manifest(config) {
        Ok(m) => m,
        Err(code) => return code,
    };

    let champion = match ChampionTracker::load(&config.champion_path, config.champion.clone()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to load champion tracker");
            return EXIT_MISCONFIGURATION;
        }
    };
    let history = IterationHistory::new(&config.history.path);
    let diversity = DiversityMonitor::new(config.diversity.clone());
    let alerts = AlertManager::new(config.alert_config());

    let mut executor = match IterationExecutor::new(
        config.composer.clone(),
        manifest,
        sandbox,
        champion,
        history,
        diversity,
        alerts,
        config.exploration_burst,
        config.failure_patterns_path.clone(),
        config.alerts_log_path.clone(),
    ) {
        Ok(executor) => executor,
        Err(e) => {
            tracing::error!(error = %e, "failed to construct iteration executor");
            return EXIT_MISCONFIGURATION;
        }
    };
    let proposer = MockProposer::with_default_pool();

    for i in 0..iterations {
        match executor.run_iteration(&proposer, None, i).await {
            Ok(record) => {
                tracing::info!(
                    iteration_index = record.iteration_index,
                    outcome_level = %record.outcome_level,
                    champion_update = record.champion_update,
                    "iteration complete"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, iteration_index = i, "iteration failed");
                return EXIT_SANDBOX_UNAVAILABLE;
            }
        }
    }

    EXIT_SUCCESS
}

fn status(config: &Config, last: usize) -> i32 {
    let champion = match ChampionTracker::load(&config.champion_path, config.champion.clone()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to load champion tracker");
            return EXIT_MISCONFIGURATION;
        }
    };
    let history = IterationHistory::new(&config.history.path);

    println!("champion: {}", serde_json::to_string_pretty(&champion.current()).unwrap_or_default());

    match history.tail(last) {
        Ok(records) => {
            println!("last {} outcomes:", records.len());
            for record in &records {
                println!(
                    "  iteration {} -> {} (champion_update={})",
                    record.iteration_index, record.outcome_level, record.champion_update
                );
            }
        }
        Err(e) => tracing::warn!(error = %e, "failed to read history"),
    }

    EXIT_SUCCESS
}

fn rollback(config: &Config, to: u64) -> i32 {
    let mut champion = match ChampionTracker::load(&config.champion_path, config.champion.clone()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to load champion tracker");
            return EXIT_MISCONFIGURATION;
        }
    };
    let history = IterationHistory::new(&config.history.path);

    match champion.rollback_to(to, &history) {
        Ok(()) => {
            tracing::info!(iteration_index = to, "champion rolled back");
            EXIT_SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, iteration_index = to, "rollback failed");
            EXIT_MISCONFIGURATION
        }
    }
}

fn validate(config: &Config, file: &std::path::Path) -> i32 {
    let manifest = match load_field_manifest(config) {
        Ok(m) => m,
        Err(code) => return code,
    };

    let text = match std::fs::read_to_string(file) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, path = %file.display(), "failed to read artifact file");
            return EXIT_MISCONFIGURATION;
        }
    };

    match crate::validator::validate(&text, &manifest) {
        Ok(outcome) => {
            if outcome.ok {
                println!("ok");
                EXIT_SUCCESS
            } else {
                for violation in &outcome.violations {
                    println!("line {}: {} ({})", violation.line, violation.rule, violation.matched_text);
                    if let Some(suggestion) = &violation.suggestion {
                        println!("  suggestion: {suggestion}");
                    }
                }
                EXIT_VALIDATION_FAILURE
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "validator failed to parse artifact");
            EXIT_VALIDATION_FAILURE
        }
    }
}
