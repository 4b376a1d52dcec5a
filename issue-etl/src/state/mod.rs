//! Incremental sync bookkeeping.

mod watermark;

pub use watermark::*;
