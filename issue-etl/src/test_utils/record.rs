use serde_json::{Value, json};

use crate::schema::{FieldSchema, TableSchema};
use crate::types::RawRecord;

/// Converts a JSON object literal into a [`RawRecord`].
///
/// # Panics
/// Panics if `value` is not an object.
pub fn raw_record(value: Value) -> RawRecord {
    match value {
        Value::Object(record) => record,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Builds an issue as returned by the search endpoint.
pub fn issue(key: &str, summary: &str, labels: Option<&[&str]>) -> RawRecord {
    let labels = match labels {
        Some(labels) => json!(labels),
        None => Value::Null,
    };

    raw_record(json!({
        "id": "10000",
        "key": key,
        "fields": {
            "summary": summary,
            "labels": labels,
            "status": {"id": "3", "name": "In Progress"},
            "updated": "2024-05-02T10:11:12.123+0200"
        }
    }))
}

/// Schema selecting a handful of fields from [`issue`].
pub fn issue_schema() -> TableSchema {
    TableSchema::new(vec![
        FieldSchema::new("key", "string", "key").with_required(true),
        FieldSchema::new("summary", "string", "fields.summary"),
        FieldSchema::new("status", "string", "fields.status.name").with_required(true),
        FieldSchema::new("labels", "string", "fields.labels").with_repeated(true),
        FieldSchema::new("assignee", "string", "fields.assignee.name"),
        FieldSchema::new("updated", "timestamp", "fields.updated"),
    ])
    .expect("issue schema is valid")
}
