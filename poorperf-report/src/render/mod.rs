//! Report output
//!
//! Two views over a resolved capture:
//!
//! - **show**: every sample in stream order, `pid comm pathname addr name`
//! - **top**: the capture duration, then the hottest (pid, symbol) pairs as
//!   `count comm pathname addr name`
//!
//! Each view renders as plain text (one line per item, space separated) or
//! as JSON for other tools.

use crate::analysis::RankedEntry;
use crate::domain::{Address, Pid, ReportError, SymbolName};
use crate::parser::Record;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Write the `show` view.
///
/// # Errors
/// Fails on a write error, or if a record lacks one of the shown columns.
pub fn render_show<W: Write>(
    out: &mut W,
    records: &[Record],
    format: OutputFormat,
) -> Result<(), ReportError> {
    match format {
        OutputFormat::Text => {
            for record in records {
                writeln!(
                    out,
                    "{} {} {} {} {}",
                    record.pid()?,
                    record.comm()?,
                    record.pathname()?,
                    record.addr()?,
                    record.name()?
                )?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, records)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct TopEntryView<'a> {
    count: usize,
    percentage: f64,
    pid: &'a Pid,
    name: &'a SymbolName,
    comm: &'a str,
    pathname: &'a str,
    addr: Address,
}

#[derive(Serialize)]
struct TopView<'a> {
    duration_secs: f64,
    total_samples: usize,
    entries: Vec<TopEntryView<'a>>,
}

/// Write the `top` view.
///
/// # Errors
/// Fails on a write error, or if a representative record lacks one of the
/// shown columns.
pub fn render_top<W: Write>(
    out: &mut W,
    duration_secs: f64,
    total_samples: usize,
    ranked: &[RankedEntry<'_>],
    format: OutputFormat,
) -> Result<(), ReportError> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "duration: {duration_secs}s")?;
            for entry in ranked {
                let sample = entry.representative;
                writeln!(
                    out,
                    "{} {} {} {} {}",
                    entry.count,
                    sample.comm()?,
                    sample.pathname()?,
                    sample.addr()?,
                    entry.key.name
                )?;
            }
        }
        OutputFormat::Json => {
            let entries = ranked
                .iter()
                .map(|entry| {
                    Ok(TopEntryView {
                        count: entry.count,
                        percentage: entry.percentage,
                        pid: &entry.key.pid,
                        name: &entry.key.name,
                        comm: entry.representative.comm()?,
                        pathname: entry.representative.pathname()?,
                        addr: entry.representative.addr()?,
                    })
                })
                .collect::<Result<Vec<_>, ReportError>>()?;
            let view = TopView { duration_secs, total_samples, entries };
            serde_json::to_writer_pretty(&mut *out, &view)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
