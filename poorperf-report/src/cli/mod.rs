//! Command-line interface for poorperf-report
//!
//! This module contains CLI argument parsing

pub mod args;

pub use args::{Args, Mode, ResolverKind};
