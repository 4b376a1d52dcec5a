use chrono::{DateTime, FixedOffset, Utc};
use issue_etl::types::FlatRecord;
use serde_json::{Map, Value};

/// Format Jira uses for timestamps, e.g. `2019-05-02T10:11:12.123+0200`.
///
/// The fraction is optional when parsing.
const JIRA_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Format of a UTC `TIMESTAMP` literal accepted by BigQuery streaming inserts.
const BIGQUERY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Rewrites a Jira timestamp into a UTC BigQuery timestamp literal.
///
/// Returns `None` when `value` is not a Jira timestamp.
pub fn jira_timestamp_to_bigquery(value: &str) -> Option<String> {
    let timestamp = DateTime::<FixedOffset>::parse_from_str(value, JIRA_TIMESTAMP_FORMAT).ok()?;

    Some(
        timestamp
            .with_timezone(&Utc)
            .format(BIGQUERY_TIMESTAMP_FORMAT)
            .to_string(),
    )
}

/// Formats a run timestamp the way the execution ledger stores it.
pub fn utc_to_bigquery(timestamp: DateTime<Utc>) -> String {
    timestamp.format(BIGQUERY_TIMESTAMP_FORMAT).to_string()
}

/// Converts a [`FlatRecord`] into the JSON object sent for one row.
///
/// Top-level string values holding a Jira timestamp are rewritten to UTC, everything else is
/// passed through unchanged.
pub fn encode_row(record: FlatRecord) -> Map<String, Value> {
    record
        .into_values()
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(text) => match jira_timestamp_to_bigquery(&text) {
                    Some(timestamp) => Value::String(timestamp),
                    None => Value::String(text),
                },
                other => other,
            };

            (name, value)
        })
        .collect()
}
