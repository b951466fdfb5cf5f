//! CLI argument definitions

use crate::domain::TimeUnit;
use crate::render::OutputFormat;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Every sample, in capture order
    Show,
    /// Capture duration and the hottest (pid, symbol) pairs
    Top,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ResolverKind {
    /// Run the external addr2line tool per batch
    #[default]
    Addr2line,
    /// Read DWARF debug info in process
    Dwarf,
}

#[derive(Parser, Debug)]
#[command(
    name = "report",
    version,
    about = "Resolve and summarize poor_perf sample captures",
    after_help = "\
EXAMPLES:
    report top profile.txt                   Hottest symbols per process
    report show a.txt b.txt                  Annotated samples, files concatenated
    cat profile.txt | report top --limit 10  Read the capture from stdin"
)]
pub struct Args {
    /// Report to produce
    #[arg(value_enum, value_name = "MODE")]
    pub mode: Mode,

    /// Capture files, read in order (standard input if none)
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Entries shown by `top`
    #[arg(short = 'n', long, default_value_t = crate::analysis::DEFAULT_TOP_N)]
    pub limit: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Unit of the capture's time column
    #[arg(long, value_enum, default_value_t = TimeUnit::Nanoseconds)]
    pub time_unit: TimeUnit,

    /// Symbol resolver backend
    #[arg(long, value_enum, default_value_t = ResolverKind::Addr2line)]
    pub resolver: ResolverKind,

    /// addr2line executable used by the addr2line backend
    #[arg(long, value_name = "PATH", default_value = crate::symbolization::addr2line_command::DEFAULT_PROGRAM)]
    pub addr2line: PathBuf,

    /// Addresses per resolver call
    #[arg(long, default_value_t = crate::symbolization::DEFAULT_BATCH_SIZE,
          value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    pub batch_size: usize,

    /// Seconds before a single resolver call is abandoned
    #[arg(long, value_name = "SECS", default_value = "30")]
    pub timeout: u64,

    /// Binaries resolved concurrently (default: available CPUs)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Ask the resolver to demangle symbol names
    #[arg(short = 'C', long)]
    pub demangle: bool,

    /// Skip symbol resolution and report names as captured
    #[arg(long)]
    pub no_resolve: bool,
}
