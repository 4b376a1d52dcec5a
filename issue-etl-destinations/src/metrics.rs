use std::sync::Once;

use metrics::{Unit, describe_gauge, describe_histogram};

static REGISTER_METRICS: Once = Once::new();

pub const BQ_INSERT_ROWS: &str = "bq_insert_rows";
pub const BQ_INSERT_DURATION_MILLISECONDS: &str = "bq_insert_duration_milliseconds";

/// Describes the metrics emitted by the destinations, only the first call has an effect.
pub(crate) fn register_metrics() {
    REGISTER_METRICS.call_once(|| {
        describe_gauge!(
            BQ_INSERT_ROWS,
            Unit::Count,
            "Number of rows sent in the last insert request to BigQuery"
        );

        describe_histogram!(
            BQ_INSERT_DURATION_MILLISECONDS,
            Unit::Milliseconds,
            "Time taken in milliseconds by an insert request to BigQuery"
        );
    });
}
