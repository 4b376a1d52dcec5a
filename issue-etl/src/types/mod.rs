//! Common types used throughout the ETL system.
//!
//! Re-exports the record shapes flowing through a run and the watermark that links one run to
//! the next.

mod flat_record;
mod raw_record;
mod watermark;

pub use flat_record::*;
pub use raw_record::*;
pub use watermark::*;
