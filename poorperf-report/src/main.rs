//! # report - Main Entry Point
//!
//! `report <show|top> [FILE...]`
//!
//! Reads poor_perf captures (standard input if no files), resolves sample
//! addresses to symbol names, and prints either every sample (`show`) or the
//! hottest (pid, symbol) pairs (`top`).

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;

use poorperf_report::cli::Args;
use poorperf_report::config::ReportConfig;
use poorperf_report::pipeline;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    });
}

#[tokio::main]
async fn run() -> Result<()> {
    // Usage errors exit with status 2 from inside clap
    let config = ReportConfig::from(Args::parse());

    let mut records = pipeline::load(&config)?;

    if let Some(summary) = pipeline::resolve(&config, &mut records).await? {
        for failure in &summary.failures {
            eprintln!(
                "warning: symbols unresolved for {}: {}",
                failure.binary.display(),
                failure.error
            );
        }
        pipeline::check_resolution(&summary)?;
    }

    // Render fully before writing so a failed report prints nothing
    let mut report = Vec::new();
    pipeline::render(&config, &records, &mut report)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&report).context("Failed to write report")?;
    stdout.flush().context("Failed to write report")?;

    Ok(())
}
