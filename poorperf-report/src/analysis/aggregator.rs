//! Capture-wide statistics: duration and the hottest (pid, symbol) pairs.
//!
//! # Architecture
//!
//! - **`TopCounter`** - Counts samples per `TopKey` as records are fed in
//! - **`rank()`** - Batch ranking of a resolved capture
//! - **`duration()`** - Time between the first and last sample
//!
//! # Ordering
//!
//! Keys are counted in first-encounter order and then stably sorted by
//! count, so equal counts keep the order in which their keys first appeared.
//! Running the ranking twice over the same input gives identical output.

// Percentage and duration calculations intentionally convert integers to f64
#![allow(clippy::cast_precision_loss)]

use crate::domain::{FormatError, ReportError, TimeUnit, TopKey};
use crate::parser::Record;
use indexmap::IndexMap;
use std::cmp::Reverse;

/// Entries shown by `top` unless overridden.
pub const DEFAULT_TOP_N: usize = 50;

/// One line of the `top` report.
#[derive(Debug, Clone)]
pub struct RankedEntry<'a> {
    pub key: TopKey,

    /// Samples that resolved to this key.
    pub count: usize,

    /// Share of all samples (0.0 - 100.0).
    pub percentage: f64,

    /// First record seen with this key. Supplies the display-only columns
    /// (comm, pathname, addr); other records with the same key may differ.
    pub representative: &'a Record,
}

#[derive(Debug)]
struct KeyStats<'a> {
    count: usize,
    representative: &'a Record,
}

/// Sample counter keyed by (pid, resolved name).
#[derive(Debug, Default)]
pub struct TopCounter<'a> {
    keys: IndexMap<TopKey, KeyStats<'a>>,
    total_samples: usize,
}

impl<'a> TopCounter<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one record.
    ///
    /// # Errors
    /// Fails if the record lacks `pid` or `name`.
    pub fn record(&mut self, record: &'a Record) -> Result<(), FormatError> {
        let key = TopKey { pid: record.pid()?, name: record.name()? };
        self.total_samples += 1;
        self.keys
            .entry(key)
            .or_insert(KeyStats { count: 0, representative: record })
            .count += 1;
        Ok(())
    }

    #[must_use]
    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    /// Distinct keys seen so far.
    #[must_use]
    pub fn distinct_keys(&self) -> usize {
        self.keys.len()
    }

    /// The `limit` highest counts, descending, ties in first-seen order.
    #[must_use]
    pub fn ranked(&self, limit: usize) -> Vec<RankedEntry<'a>> {
        let mut entries: Vec<RankedEntry<'a>> = self
            .keys
            .iter()
            .map(|(key, stats)| RankedEntry {
                key: key.clone(),
                count: stats.count,
                percentage: if self.total_samples > 0 {
                    (stats.count as f64 / self.total_samples as f64) * 100.0
                } else {
                    0.0
                },
                representative: stats.representative,
            })
            .collect();

        // Stable sort: the tie-break is the counter's insertion order
        entries.sort_by_key(|entry| Reverse(entry.count));
        entries.truncate(limit);
        entries
    }
}

/// Rank a resolved capture.
///
/// # Errors
/// Fails if a record lacks `pid` or `name`.
pub fn rank(records: &[Record], limit: usize) -> Result<Vec<RankedEntry<'_>>, FormatError> {
    let mut counter = TopCounter::new();
    for record in records {
        counter.record(record)?;
    }
    Ok(counter.ranked(limit))
}

/// Seconds between the first and the last record, in stream order.
///
/// # Errors
/// Returns `EmptyInput` for an empty capture, or a `FormatError` if either
/// endpoint has no valid `time`.
pub fn duration(records: &[Record], unit: TimeUnit) -> Result<f64, ReportError> {
    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Err(ReportError::EmptyInput);
    };
    // Widened so any two parsed timestamps subtract without overflow
    let ticks = i128::from(last.time()?) - i128::from(first.time()?);
    Ok(ticks as f64 / unit.per_second())
}
