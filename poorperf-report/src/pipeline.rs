//! Parse → resolve → report
//!
//! Each stage is a separate call so the binary can surface per-binary
//! resolver warnings between resolution and rendering.

use crate::analysis::{duration, TopCounter};
use crate::cli::{Mode, ResolverKind};
use crate::config::ReportConfig;
use crate::domain::ReportError;
use crate::parser::{parse_sources, Record};
use crate::render::{render_show, render_top};
use crate::symbolization::{
    Addr2lineCommand, BatchResolver, DwarfResolver, ResolutionSummary, SymbolResolver,
};
use log::info;
use std::io::Write;

/// Read every configured input into memory.
///
/// # Errors
/// Fails on an unreadable input or malformed capture.
pub fn load(config: &ReportConfig) -> Result<Vec<Record>, ReportError> {
    let records = parse_sources(&config.files)?;
    info!("loaded {} samples", records.len());
    Ok(records)
}

/// Resolve symbol names in place with the configured backend.
///
/// Returns `None` when resolution is disabled. Per-binary failures are in
/// the summary; the caller decides how to report them.
///
/// # Errors
/// Returns a `FormatError` if records lack the columns resolution needs.
pub async fn resolve(
    config: &ReportConfig,
    records: &mut [Record],
) -> Result<Option<ResolutionSummary>, ReportError> {
    let Some(kind) = config.resolver else {
        return Ok(None);
    };

    let summary = match kind {
        ResolverKind::Addr2line => {
            let command = Addr2lineCommand::new(&config.addr2line)
                .with_demangle(config.demangle)
                .with_timeout(config.timeout);
            batch_resolver(config, command).resolve_records(records).await?
        }
        ResolverKind::Dwarf => {
            batch_resolver(config, DwarfResolver::new(config.demangle))
                .resolve_records(records)
                .await?
        }
    };

    Ok(Some(summary))
}

fn batch_resolver<R: SymbolResolver>(config: &ReportConfig, resolver: R) -> BatchResolver<R> {
    BatchResolver::new(resolver)
        .with_batch_size(config.batch_size)
        .with_max_concurrent(config.jobs)
}

/// Fail the run if resolution was attempted and nothing resolved.
///
/// # Errors
/// Returns `ResolutionFailed` when every attempted binary failed.
pub fn check_resolution(summary: &ResolutionSummary) -> Result<(), ReportError> {
    if summary.all_failed() {
        return Err(ReportError::ResolutionFailed { failed: summary.failures.len() });
    }
    Ok(())
}

/// Render the configured report.
///
/// # Errors
/// `top` fails with `EmptyInput` on an empty capture; both views fail on
/// write errors.
pub fn render<W: Write>(config: &ReportConfig, records: &[Record], out: &mut W) -> Result<(), ReportError> {
    match config.mode {
        Mode::Show => render_show(out, records, config.format),
        Mode::Top => {
            let secs = duration(records, config.time_unit)?;
            let mut counter = TopCounter::new();
            for record in records {
                counter.record(record)?;
            }
            let ranked = counter.ranked(config.limit);
            render_top(out, secs, counter.total_samples(), &ranked, config.format)
        }
    }
}
