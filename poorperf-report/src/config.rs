//! Resolved run configuration
//!
//! `Args` is what the user typed; `ReportConfig` is what the pipeline runs
//! with, defaults filled in.

use crate::cli::{Args, Mode, ResolverKind};
use crate::domain::TimeUnit;
use crate::render::OutputFormat;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub mode: Mode,
    /// Inputs in read order; empty means standard input.
    pub files: Vec<PathBuf>,
    pub limit: usize,
    pub format: OutputFormat,
    pub time_unit: TimeUnit,
    /// `None` skips resolution.
    pub resolver: Option<ResolverKind>,
    pub addr2line: PathBuf,
    pub batch_size: usize,
    pub timeout: Duration,
    pub jobs: usize,
    pub demangle: bool,
}

impl ReportConfig {
    /// Defaults for `mode`, as if no options had been given.
    #[must_use]
    pub fn new(mode: Mode, files: Vec<PathBuf>) -> Self {
        Self {
            mode,
            files,
            limit: crate::analysis::DEFAULT_TOP_N,
            format: OutputFormat::default(),
            time_unit: TimeUnit::default(),
            resolver: Some(ResolverKind::default()),
            addr2line: PathBuf::from(crate::symbolization::addr2line_command::DEFAULT_PROGRAM),
            batch_size: crate::symbolization::DEFAULT_BATCH_SIZE,
            timeout: crate::symbolization::addr2line_command::DEFAULT_TIMEOUT,
            jobs: default_jobs(),
            demangle: false,
        }
    }
}

impl From<Args> for ReportConfig {
    fn from(args: Args) -> Self {
        Self {
            mode: args.mode,
            files: args.files,
            limit: args.limit,
            format: args.format,
            time_unit: args.time_unit,
            resolver: (!args.no_resolve).then_some(args.resolver),
            addr2line: args.addr2line,
            batch_size: args.batch_size.max(1),
            timeout: Duration::from_secs(args.timeout),
            jobs: args.jobs.unwrap_or_else(default_jobs).max(1),
            demangle: args.demangle,
        }
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}
