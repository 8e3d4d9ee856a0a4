//! CLI argument parsing and command dispatch

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::time::Instant;
use yload_core::{ConfigError, GeneratorBuilder};

use crate::config::{Overrides, RunConfig, Target};
use crate::summary::{OutcomeLine, Summary};

#[derive(Parser)]
#[command(name = "yload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate load against a target
    Run(RunArgs),
    /// Validate a configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Path to a JSON configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Caller to drive
    #[arg(long, value_enum)]
    pub target: Option<Target>,

    /// Endpoint for the http target
    #[arg(long)]
    pub url: Option<String>,

    /// Operation name sent with every request
    #[arg(long)]
    pub op: Option<String>,

    /// Per-call timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Calls per second
    #[arg(long)]
    pub rate: Option<u32>,

    /// Fire as fast as tickets allow, with this many tickets
    #[arg(long, value_name = "CONCURRENCY")]
    pub unrated: Option<u32>,

    /// Run duration in milliseconds
    #[arg(long)]
    pub duration_ms: Option<u64>,

    /// Result channel capacity
    #[arg(long)]
    pub buffer: Option<usize>,

    /// Simulated latency of the echo callee in milliseconds
    #[arg(long)]
    pub echo_delay_ms: Option<u64>,

    /// Make the echo callee fail every Nth call
    #[arg(long)]
    pub echo_fail_every: Option<u64>,

    /// Print one JSON line per outcome and a JSON report
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            target: self.target,
            url: self.url.clone(),
            op_name: self.op.clone(),
            timeout_ms: self.timeout_ms,
            rate: self.rate,
            unrated: self.unrated,
            duration_ms: self.duration_ms,
            buffer: self.buffer,
            echo_delay_ms: self.echo_delay_ms,
            echo_fail_every: self.echo_fail_every,
        }
    }
}

/// Execute the parsed command
pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Validate { config } => validate(&config),
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let config = RunConfig::load(args.config.as_deref())?.merge(args.overrides());
    let caller = config.build_caller()?;

    let (generator, mut outcomes) = GeneratorBuilder::new()
        .caller(caller)
        .params(config.params.clone())
        .result_buffer(config.result_buffer)
        .build()
        .context("invalid run parameters")?;
    let generator = Arc::new(generator);

    tracing::info!(caller = %config.target, op = %config.op_name, "Run configured");

    let started = Instant::now();
    if !generator.start() {
        bail!("load generator failed to start");
    }

    // Spawn signal handler task
    let signal_handle = {
        let generator = Arc::clone(&generator);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Received Ctrl+C, stopping load generator...");
                    generator.stop();
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                }
            }
        })
    };

    let mut summary = Summary::new()?;
    while let Some(outcome) = outcomes.recv().await {
        if args.json {
            println!("{}", serde_json::to_string(&OutcomeLine::from(&outcome))?);
        }
        summary.record(&outcome);
    }

    let dispatched = generator.join().await.unwrap_or_default();
    signal_handle.abort();
    // The deadline closes the stream but leaves the generator running
    generator.stop();

    let elapsed = started.elapsed();
    let report = summary.finish(generator.params(), elapsed, generator.stats());
    tracing::info!(
        dispatched,
        delivered = report.delivered,
        dropped = report.dropped,
        elapsed_secs = elapsed.as_secs_f64(),
        "Run completed"
    );

    if args.json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

fn validate(path: &std::path::Path) -> Result<()> {
    let config = RunConfig::from_file(path)?;

    let problems = check(&config);

    if !problems.is_empty() {
        for problem in &problems {
            eprintln!("  - {problem}");
        }
        bail!("{} is invalid ({} problems)", path.display(), problems.len());
    }

    println!(
        "{} is valid: target {}, rate {}, concurrency {}",
        path.display(),
        config.target,
        config.params.rate,
        config.params.concurrency()
    );
    Ok(())
}

/// Everything `run` would reject before starting
fn check(config: &RunConfig) -> Vec<String> {
    let mut builder = GeneratorBuilder::new()
        .params(config.params.clone())
        .result_buffer(config.result_buffer);
    let mut problems = Vec::new();
    match config.build_caller() {
        Ok(caller) => builder = builder.caller(caller),
        Err(e) => problems.push(format!("{e:#}")),
    }

    if let Err(errors) = builder.validate() {
        problems.extend(
            errors
                .iter()
                // Already reported with its cause
                .filter(|e| !matches!(e, ConfigError::MissingCaller))
                .map(ToString::to_string),
        );
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "yload",
            "run",
            "--target",
            "echo",
            "--timeout-ms",
            "100",
            "--rate",
            "10",
            "--duration-ms",
            "1000",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.target, Some(Target::Echo));
                assert_eq!(args.timeout_ms, Some(100));
                assert_eq!(args.rate, Some(10));
                assert!(args.json);
                assert!(args.config.is_none());
            }
            Commands::Validate { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_validate() {
        let cli = Cli::try_parse_from(["yload", "-v", "validate", "--config", "run.json"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Validate { .. }));
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        assert!(Cli::try_parse_from(["yload", "run", "--target", "grpc"]).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_echo_target() {
        let args = RunArgs {
            timeout_ms: Some(100),
            rate: Some(10),
            duration_ms: Some(300),
            ..Default::default()
        };
        run(args).await.unwrap();
    }

    #[test]
    fn test_check_matches_builder_limits() {
        let config = RunConfig::default().merge(Overrides {
            timeout_ms: Some(100),
            rate: Some(10),
            duration_ms: Some(1000),
            buffer: Some(usize::MAX),
            ..Default::default()
        });

        let problems = check(&config);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("exceeds the channel limit"));
    }

    #[test]
    fn test_check_reports_caller_and_params() {
        let config = RunConfig {
            target: Target::Http,
            result_buffer: 0,
            ..Default::default()
        };

        let problems = check(&config);
        // Missing url, zero timeout, zero duration, zero buffer
        assert_eq!(problems.len(), 4, "{problems:?}");
        assert!(problems[0].contains("url"));
    }

    #[test]
    fn test_check_accepts_valid_config() {
        let config = RunConfig::default().merge(Overrides {
            timeout_ms: Some(100),
            rate: Some(10),
            duration_ms: Some(1000),
            ..Default::default()
        });
        assert!(check(&config).is_empty());
    }

    #[tokio::test]
    async fn test_run_rejects_missing_parameters() {
        let err = run(RunArgs::default()).await.unwrap_err();
        assert!(format!("{err:#}").contains("invalid timeout"));
    }
}
