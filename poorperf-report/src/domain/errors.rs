//! Structured error types for poorperf-report
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Structurally invalid capture input. Always fatal for the run.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("{source_name}:{line_no}: data line before any `$` header: {line}")]
    DataBeforeHeader { source_name: String, line_no: usize, line: String },

    #[error("{source_name}:{line_no}: empty `$` header")]
    EmptyHeader { source_name: String, line_no: usize },

    #[error(
        "{source_name}:{line_no}: expected {expected} fields, found {found}: {line}"
    )]
    FieldCountMismatch {
        source_name: String,
        line_no: usize,
        expected: usize,
        found: usize,
        line: String,
    },

    #[error("{source_name}:{line_no}: field `{field}` is not declared by the active header")]
    UnknownField { source_name: String, line_no: usize, field: String },

    #[error("{source_name}:{line_no}: invalid `{field}` value {value:?}")]
    InvalidField { source_name: String, line_no: usize, field: String, value: String },
}

/// Failure of one external resolver invocation. Degrades only the binary it
/// was resolving.
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status} for {binary}")]
    ExitStatus { program: String, binary: PathBuf, status: std::process::ExitStatus },

    #[error("Resolver for {binary} timed out after {timeout:?}")]
    Timeout { binary: PathBuf, timeout: Duration },

    #[error("Resolver output for {binary} is not valid UTF-8")]
    Decode { binary: PathBuf },

    #[error("Resolver returned {found} names for {expected} addresses in {binary}")]
    Malformed { binary: PathBuf, expected: usize, found: usize },

    #[error("Failed to load debug info from {binary}: {reason}")]
    DebugInfo { binary: PathBuf, reason: String },

    #[error("Resolver task for {binary} aborted: {reason}")]
    Aborted { binary: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Top-level failure of a report run.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("No samples in input: duration is undefined")]
    EmptyInput,

    #[error("Symbol resolution failed for all {failed} binaries")]
    ResolutionFailed { failed: usize },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_names_the_line() {
        let err = FormatError::DataBeforeHeader {
            source_name: "profile.txt".to_string(),
            line_no: 3,
            line: "1;0;5;app;-;0x1;-".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "profile.txt:3: data line before any `$` header: 1;0;5;app;-;0x1;-"
        );
    }

    #[test]
    fn test_malformed_resolver_output() {
        let err = ResolverError::Malformed {
            binary: PathBuf::from("/usr/bin/my-app"),
            expected: 200,
            found: 199,
        };
        assert!(err.to_string().contains("/usr/bin/my-app"));
        assert!(err.to_string().contains("199 names for 200 addresses"));
    }

    #[test]
    fn test_report_error_wraps_format_error() {
        let err: ReportError = FormatError::EmptyHeader {
            source_name: "<stdin>".to_string(),
            line_no: 1,
        }
        .into();
        assert!(matches!(err, ReportError::Format(_)));
        assert_eq!(err.to_string(), "<stdin>:1: empty `$` header");
    }
}
