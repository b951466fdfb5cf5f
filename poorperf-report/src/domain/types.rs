//! Domain types providing compile-time safety and self-documentation
//!
//! Record values stay in the textual form the capture agent wrote them in.
//! Addresses in particular are never parsed: they are opaque keys that get
//! handed back to the resolver verbatim.

use serde::Serialize;
use std::fmt;

/// Sentinel used by the capture format for "no value": an unresolved symbol
/// or a sample without an associated binary (kernel addresses).
pub const UNRESOLVED: &str = "-";

/// Process ID
///
/// Kept as text because the capture agent may emit either a number or a
/// placeholder for kernel threads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Pid(pub String);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Pid {
    fn from(pid: &str) -> Self {
        Pid(pid.to_string())
    }
}

/// Instruction address in the resolver's native string form (e.g. `0x4005d4`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of a hex address, if it is one.
    #[must_use]
    pub fn to_u64(&self) -> Option<u64> {
        let digits = self.0.strip_prefix("0x").or_else(|| self.0.strip_prefix("0X"))?;
        u64::from_str_radix(digits, 16).ok()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(addr: &str) -> Self {
        Address(addr.to_string())
    }
}

/// Resolved (or sentinel) symbol name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SymbolName(pub String);

impl SymbolName {
    #[must_use]
    pub fn unresolved() -> Self {
        SymbolName(UNRESOLVED.to_string())
    }

    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        self.0 == UNRESOLVED
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SymbolName {
    fn from(name: &str) -> Self {
        SymbolName(name.to_string())
    }
}

/// Aggregation key for the `top` report.
///
/// Two samples are the same hot entity iff they come from the same process
/// and resolved to the same symbol. Raw address and binary path are not
/// part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TopKey {
    pub pid: Pid,
    pub name: SymbolName,
}

impl TopKey {
    pub fn new(pid: impl Into<Pid>, name: impl Into<SymbolName>) -> Self {
        Self { pid: pid.into(), name: name.into() }
    }
}

impl fmt::Display for TopKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.pid, self.name)
    }
}

/// Unit of the `time` column in a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TimeUnit {
    #[default]
    #[value(name = "ns")]
    Nanoseconds,
    #[value(name = "us")]
    Microseconds,
    #[value(name = "ms")]
    Milliseconds,
    #[value(name = "s")]
    Seconds,
}

impl TimeUnit {
    /// Number of ticks of this unit in one second.
    #[must_use]
    pub fn per_second(self) -> f64 {
        match self {
            TimeUnit::Nanoseconds => 1e9,
            TimeUnit::Microseconds => 1e6,
            TimeUnit::Milliseconds => 1e3,
            TimeUnit::Seconds => 1.0,
        }
    }
}
