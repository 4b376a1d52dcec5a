//! Destinations receiving extracted records and keeping the execution ledger.
//!
//! Provides the [`Destination`] trait and an in-memory implementation. The BigQuery destination
//! lives in the `issue-etl-destinations` crate.

mod base;
pub mod memory;

pub use base::*;
