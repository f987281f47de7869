//! Aggregation engine.
//!
//! Classifies proposals into reduction/freeze/other tallies and groups
//! them by budget year, legislator and department.

pub mod aggregator;
pub mod tally;

pub use aggregator::*;
pub use tally::{accumulate, Tally};
