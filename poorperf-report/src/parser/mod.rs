//! Capture stream parser
//!
//! The capture agent writes a line-oriented, self-describing text format:
//!
//! ```text
//! # comment line, ignored
//! $ time;cpu;pid;comm;pathname;addr;name
//! 25733629246420;0;0;<swapper>;-;0xffffffffbe3dd34a;-
//! ```
//!
//! A `$` line declares the field names for every following data line until
//! the next `$` line. Several inputs are read as one concatenated stream, so
//! a header declared in one file stays active in the next until superseded.

pub mod header;
pub mod record;

pub use header::{fields, FormatHeader, HEADER_MARKER};
pub use record::Record;

use crate::domain::{FormatError, ReportError};
use log::debug;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

const COMMENT_MARKER: char = '#';

/// Display name used for standard input.
pub const STDIN_NAME: &str = "<stdin>";

/// Line-by-line parser holding the active header.
#[derive(Debug)]
pub struct RecordParser {
    header: Option<Arc<FormatHeader>>,
    source_name: Arc<str>,
    line_no: usize,
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordParser {
    #[must_use]
    pub fn new() -> Self {
        Self { header: None, source_name: Arc::from(STDIN_NAME), line_no: 0 }
    }

    /// Start reading a new input. Line numbers restart; the header does not.
    pub fn begin_source(&mut self, name: &str) {
        self.source_name = Arc::from(name);
        self.line_no = 0;
    }

    /// Header currently in effect, if any was declared.
    #[must_use]
    pub fn header(&self) -> Option<&FormatHeader> {
        self.header.as_deref()
    }

    /// Parse one line. Returns `Ok(None)` for comments, headers and blank lines.
    ///
    /// # Errors
    /// Returns a `FormatError` for a data line before any header, an empty
    /// header, or a field count that differs from the active header.
    pub fn parse_line(&mut self, line: &str) -> Result<Option<Record>, FormatError> {
        self.line_no += 1;
        let line = line.trim_end_matches(['\n', '\r']);

        if line.starts_with(COMMENT_MARKER) || line.trim().is_empty() {
            return Ok(None);
        }

        if let Some(body) = line.strip_prefix(HEADER_MARKER) {
            let header = FormatHeader::parse(body).ok_or_else(|| FormatError::EmptyHeader {
                source_name: self.source_name.to_string(),
                line_no: self.line_no,
            })?;
            debug!("{}:{}: header {:?}", self.source_name, self.line_no, header.fields());
            self.header = Some(Arc::new(header));
            return Ok(None);
        }

        let Some(header) = &self.header else {
            return Err(FormatError::DataBeforeHeader {
                source_name: self.source_name.to_string(),
                line_no: self.line_no,
                line: line.to_string(),
            });
        };

        let values = line.split(';').map(|token| token.trim().to_string()).collect::<Vec<_>>();
        if values.len() != header.len() {
            return Err(FormatError::FieldCountMismatch {
                source_name: self.source_name.to_string(),
                line_no: self.line_no,
                expected: header.len(),
                found: values.len(),
                line: line.to_string(),
            });
        }

        Ok(Some(Record::new(Arc::clone(header), values, Arc::clone(&self.source_name), self.line_no)))
    }

    /// Lazily parse every line of `reader` as input `name`.
    pub fn records<'a, R: BufRead + 'a>(
        &'a mut self,
        name: &str,
        reader: R,
    ) -> impl Iterator<Item = Result<Record, ReportError>> + 'a {
        self.begin_source(name);
        let read_name = name.to_string();
        reader.lines().filter_map(move |line| match line {
            Ok(line) => self.parse_line(&line).map_err(ReportError::from).transpose(),
            Err(source) => Some(Err(ReportError::Read { path: read_name.clone(), source })),
        })
    }
}

/// Parse an in-memory capture.
///
/// # Errors
/// Returns the first `FormatError` encountered.
pub fn parse_str(input: &str) -> Result<Vec<Record>, FormatError> {
    let mut parser = RecordParser::new();
    let mut records = Vec::new();
    for line in input.lines() {
        if let Some(record) = parser.parse_line(line)? {
            records.push(record);
        }
    }
    Ok(records)
}

/// Read and parse every input in order, or standard input if `paths` is empty.
///
/// The whole stream is materialized: symbol resolution needs every record
/// before it can group by binary.
///
/// # Errors
/// Fails on the first unreadable input or malformed line.
pub fn parse_sources(paths: &[PathBuf]) -> Result<Vec<Record>, ReportError> {
    let mut parser = RecordParser::new();
    let mut records = Vec::new();

    if paths.is_empty() {
        let stdin = io::stdin();
        for record in parser.records(STDIN_NAME, stdin.lock()) {
            records.push(record?);
        }
        return Ok(records);
    }

    for path in paths {
        let name = path.display().to_string();
        let file = File::open(path).map_err(|source| ReportError::Read { path: name.clone(), source })?;
        for record in parser.records(&name, BufReader::new(file)) {
            records.push(record?);
        }
    }

    debug!("parsed {} records from {} inputs", records.len(), paths.len());
    Ok(records)
}
