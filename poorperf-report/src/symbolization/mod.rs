//! # Symbol Resolution
//!
//! Turns the raw instruction addresses in a capture into function names.
//!
//! ## Why batches
//!
//! The capture agent records `(pathname, addr)` per sample and leaves the
//! name as `-`. Looking names up needs the binary's symbol tables, and
//! loading those is the expensive part: spawning `addr2line` once per
//! address costs one process start and one symbol-table load per sample.
//! Grouping by binary and sending a few hundred addresses per call turns
//! that into roughly one call per distinct binary.
//!
//! ## Backends
//!
//! Both implement [`SymbolResolver`]: an ordered list of addresses in, the
//! same number of names out, in the same order.
//!
//! - **`addr2line_command`**: runs the external `addr2line -f -e <binary>`
//!   tool with a per-call timeout. Default.
//! - **`dwarf`**: reads DWARF in process with the `addr2line`, `gimli` and
//!   `object` crates. Useful where binutils is not installed.
//!
//! ## Failure model
//!
//! Resolution degrades per binary. A resolver that exits non-zero, hangs
//! past its timeout, prints non-UTF-8, or returns the wrong number of names
//! fails only that binary; its samples keep the `-` sentinel and the
//! failure is listed in [`ResolutionSummary::failures`].
//!
//! ## Limitations
//!
//! - Only binaries present on the machine running the report are resolved.
//! - Addresses are passed through as written; no PIE base adjustment is
//!   applied, so captures must record file-relative addresses for
//!   position-independent binaries.

pub mod addr2line_command;
pub mod batch;
pub mod dwarf;
pub mod resolver;

pub use addr2line_command::Addr2lineCommand;
pub use batch::{
    apply_mapping, group_by_binary, AddressGroups, BatchResolver, BinaryFailure,
    ResolutionSummary, SymbolMapping, DEFAULT_BATCH_SIZE,
};
pub use dwarf::{DwarfResolver, DwarfSymbolizer};
pub use resolver::SymbolResolver;
