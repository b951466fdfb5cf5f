//! # poorperf-report - Symbolized Reports for poor_perf Captures
//!
//! The poor_perf capture agent samples a machine and writes one line per
//! sample: timestamp, cpu, pid, process name, owning binary and instruction
//! address. It does not resolve symbols. This crate turns such a capture
//! into something readable.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   Parser     │──▶│    Batch     │──▶│  Aggregator  │──▶│   Renderer   │
//! │ ($ headers)  │   │   Resolver   │   │ (duration,   │   │ (show / top, │
//! │              │   │ (per binary) │   │   ranking)   │   │  text/json)  │
//! └──────────────┘   └──────┬───────┘   └──────────────┘   └──────────────┘
//!                           │ batches of 200 addresses
//!                           ▼
//!                    ┌──────────────┐
//!                    │  addr2line   │
//!                    │ (or DWARF)   │
//!                    └──────────────┘
//! ```
//!
//! The resolver has to see the whole capture to group addresses by binary,
//! so the pipeline materializes every record after parsing. Nothing streams
//! past that point.
//!
//! ## Module Structure
//!
//! - [`parser`]: self-describing line format, `FormatHeader` and `Record`
//! - [`symbolization`]: `SymbolResolver` backends and the `BatchResolver`
//! - [`analysis`]: capture duration and (pid, symbol) ranking
//! - [`render`]: `show` and `top` views as text or JSON
//! - [`pipeline`]: the stages wired together for the binary
//! - [`cli`] / [`config`]: argument parsing and resolved settings
//! - [`domain`]: value types (`TopKey`, `Address`, ...) and errors
//!
//! ## Typical Usage
//!
//! ```bash
//! # Hottest 50 (pid, symbol) pairs
//! report top profile.txt
//!
//! # Every sample, annotated, from two captures
//! report show boot.txt steady.txt
//!
//! # Resolve in process instead of spawning addr2line
//! report top --resolver dwarf profile.txt
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod domain;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod symbolization;
