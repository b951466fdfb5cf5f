//! Analysis logic for resolved captures
//!
//! This module contains pure aggregation logic, separated from the text and
//! JSON presentation in `render`.

pub mod aggregator;

pub use aggregator::{duration, rank, RankedEntry, TopCounter, DEFAULT_TOP_N};
