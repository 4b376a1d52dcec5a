use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::destination::Destination;

/// Where the lower bound of a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkOrigin {
    /// The newest ledger row.
    Ledger,
    /// The ledger is empty.
    Empty,
    /// The ledger could not be read.
    Unavailable,
    /// The ledger was not consulted.
    Ignored,
}

/// Lower bound of a run, `None` meaning a full sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedWatermark {
    pub since: Option<DateTime<Utc>>,
    pub origin: WatermarkOrigin,
}

/// Determines the lower bound of the next run from the destination's execution ledger.
///
/// Never fails: a ledger that cannot be read degrades to a full sync, which is safe because
/// records are re-fetched rather than skipped.
pub async fn resolve_watermark<D>(destination: &D, ignore_last_run: bool) -> ResolvedWatermark
where
    D: Destination,
{
    if ignore_last_run {
        info!("ignoring the last run, performing a full sync");
        return ResolvedWatermark {
            since: None,
            origin: WatermarkOrigin::Ignored,
        };
    }

    match destination.last_execution().await {
        Ok(Some(watermark)) => {
            info!(
                timestamp = %watermark.timestamp,
                inserted = watermark.inserted,
                "resuming from last execution"
            );
            ResolvedWatermark {
                since: Some(watermark.timestamp),
                origin: WatermarkOrigin::Ledger,
            }
        }
        Ok(None) => {
            info!("no previous execution found, performing a full sync");
            ResolvedWatermark {
                since: None,
                origin: WatermarkOrigin::Empty,
            }
        }
        Err(err) => {
            warn!(error = %err, "failed to read the last execution, performing a full sync");
            ResolvedWatermark {
                since: None,
                origin: WatermarkOrigin::Unavailable,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::memory::MemoryDestination;
    use crate::schema::{FieldSchema, TableSchema};
    use chrono::TimeZone;

    async fn prepared() -> MemoryDestination {
        let destination = MemoryDestination::new();
        let schema = TableSchema::new(vec![FieldSchema::new("key", "string", "key")]).unwrap();
        destination.prepare(&schema).await.unwrap();
        destination
    }

    #[tokio::test]
    async fn uses_newest_ledger_row() {
        let destination = prepared().await;
        let at = Utc.with_ymd_and_hms(2024, 5, 2, 8, 30, 0).unwrap();
        destination.record_execution(at, 12).await.unwrap();

        let resolved = resolve_watermark(&destination, false).await;

        assert_eq!(resolved.since, Some(at));
        assert_eq!(resolved.origin, WatermarkOrigin::Ledger);
    }

    #[tokio::test]
    async fn override_ignores_ledger() {
        let destination = prepared().await;
        let at = Utc.with_ymd_and_hms(2024, 5, 2, 8, 30, 0).unwrap();
        destination.record_execution(at, 12).await.unwrap();

        let resolved = resolve_watermark(&destination, true).await;

        assert_eq!(resolved.since, None);
        assert_eq!(resolved.origin, WatermarkOrigin::Ignored);
    }

    #[tokio::test]
    async fn empty_ledger_means_full_sync() {
        let resolved = resolve_watermark(&prepared().await, false).await;
        assert_eq!(resolved.origin, WatermarkOrigin::Empty);
        assert_eq!(resolved.since, None);
    }

    #[tokio::test]
    async fn unreadable_ledger_degrades_to_full_sync() {
        // Tables were never created, so reading the ledger fails.
        let resolved = resolve_watermark(&MemoryDestination::new(), false).await;
        assert_eq!(resolved.origin, WatermarkOrigin::Unavailable);
        assert_eq!(resolved.since, None);
    }
}
