//! Tracecheck CLI - Main Entry Point
//!
//! Runs the functional tests of one test directory against a trace tool
//! and exits non-zero when any of them fails.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracecheck_runner::process::{ensure_directory, ensure_executable};
use tracecheck_runner::{CatalogOptions, RunnerConfig, TestCatalog, TestRunner};

mod output;

/// Tracecheck - golden-file functional tests for trace tools
#[derive(Parser, Debug)]
#[command(name = "tracecheck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the tool under test
    #[arg(short, long)]
    exec: PathBuf,

    /// Directory holding test.yaml and the files it names
    #[arg(short, long)]
    testdir: PathBuf,

    /// Echo command lines and captured tool output
    #[arg(short, long)]
    verbose: bool,

    /// Reject test kinds this runner does not know instead of skipping them
    #[arg(long)]
    strict: bool,

    /// Write a JSON report of every result to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            output::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    ensure_executable(&cli.exec)?;
    ensure_directory(&cli.testdir)?;

    let options = if cli.strict {
        CatalogOptions::strict()
    } else {
        CatalogOptions::default()
    };
    let catalog = TestCatalog::load_with(&cli.testdir, &options)?;
    debug!(
        "Loaded {} test(s) from {}",
        catalog.len(),
        catalog.base_dir().display()
    );

    let runner = TestRunner::new(RunnerConfig {
        tool: cli.exec.clone(),
        verbose: cli.verbose,
    })?;
    let results = runner.run(catalog.tests());

    output::print_summary(&results);

    if let Some(path) = &cli.report {
        TestRunner::write_results(&results, path)?;
    }

    Ok(results.is_success())
}
