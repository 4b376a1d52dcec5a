use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};

static REGISTER_METRICS: Once = Once::new();

pub const ETL_RECORDS_FETCHED_TOTAL: &str = "etl_records_fetched_total";
pub const ETL_RECORDS_INSERTED_TOTAL: &str = "etl_records_inserted_total";
pub const ETL_RUNS_TOTAL: &str = "etl_runs_total";
pub const ETL_RUN_DURATION_SECONDS: &str = "etl_run_duration_seconds";
pub const PROJECT: &str = "project";
pub const STATUS: &str = "status";
pub const STATUS_SUCCEEDED: &str = "succeeded";
pub const STATUS_FAILED: &str = "failed";

/// Describes the metrics emitted by a pipeline run.
///
/// Safe to call repeatedly, the descriptions are registered once.
pub(crate) fn register_metrics() {
    REGISTER_METRICS.call_once(|| {
        describe_counter!(
            ETL_RECORDS_FETCHED_TOTAL,
            Unit::Count,
            "Total number of records fetched from the source"
        );

        describe_counter!(
            ETL_RECORDS_INSERTED_TOTAL,
            Unit::Count,
            "Total number of extracted records inserted into the destination"
        );

        describe_counter!(
            ETL_RUNS_TOTAL,
            Unit::Count,
            "Total number of pipeline runs, labeled by outcome"
        );

        describe_histogram!(
            ETL_RUN_DURATION_SECONDS,
            Unit::Seconds,
            "Time taken in seconds by a pipeline run"
        );
    });
}
