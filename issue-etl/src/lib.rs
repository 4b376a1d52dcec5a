//! Incremental issue-tracker ETL.
//!
//! Pulls changed issues from a tracker's search API page by page, reshapes them into a flat
//! schema declared as data and appends them to a table store that also keeps an execution
//! ledger. The newest ledger row bounds the next run, so every run only fetches what changed.

pub mod destination;
pub mod error;
pub mod extract;
mod macros;
pub mod metrics;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod state;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
