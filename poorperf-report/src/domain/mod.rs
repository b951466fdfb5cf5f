//! Domain model for poorperf-report
//!
//! This module contains core domain types and errors that provide:
//! - Value-based aggregation keys (`TopKey`)
//! - Newtypes for the opaque record fields the pipeline consumes
//! - Structured error handling for each pipeline stage

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{Address, Pid, SymbolName, TimeUnit, TopKey, UNRESOLVED};

pub use errors::{FormatError, ReportError, ResolverError};
