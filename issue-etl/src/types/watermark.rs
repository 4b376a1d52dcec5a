use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a successful run as stored in the execution ledger.
///
/// A [`Watermark`] states that as of `timestamp`, the run that wrote it had fetched `inserted`
/// source records. Watermarks are append-only: every run writes a new one and the newest one is
/// the lower bound of the next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    pub timestamp: DateTime<Utc>,
    pub inserted: u64,
}

impl Watermark {
    pub fn new(timestamp: DateTime<Utc>, inserted: u64) -> Self {
        Self {
            timestamp,
            inserted,
        }
    }
}
