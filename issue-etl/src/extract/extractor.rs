use serde_json::Value;
use tracing::debug;

use crate::error::{ErrorKind, EtlResult};
use crate::extract::path::{Lookup, lookup};
use crate::schema::{FieldSchema, PATH_SEPARATOR, TableSchema};
use crate::types::{FlatRecord, RawRecord, record_key};
use crate::{bail, etl_error};

/// Reshapes one raw record into the flat target schema.
///
/// The output has exactly one entry per schema field, in schema order, and nothing else. A
/// required field whose path cannot be resolved fails the whole record; optional fields degrade
/// to `null`, repeated fields to `[]`.
pub fn extract(schema: &TableSchema, record: &RawRecord) -> EtlResult<FlatRecord> {
    let Some(key) = record_key(record) else {
        bail!(
            ErrorKind::MissingRecordKey,
            "Record has no key",
            truncated(&Value::Object(record.clone()).to_string())
        );
    };

    let mut flat = FlatRecord::new(key);
    for field in schema.fields() {
        let value = extract_field(field, record)?;
        flat.insert(field.name.clone(), value);
    }

    Ok(flat)
}

/// Extracts every record, stopping at the first failure.
pub fn extract_many(schema: &TableSchema, records: &[RawRecord]) -> EtlResult<Vec<FlatRecord>> {
    let mut flat_records = Vec::with_capacity(records.len());
    for record in records {
        let flat = extract(schema, record)?;
        debug!(key = flat.key(), "extracted record");
        flat_records.push(flat);
    }

    Ok(flat_records)
}

fn extract_field(field: &FieldSchema, record: &RawRecord) -> EtlResult<Value> {
    let segments = field.path_segments();
    let result = lookup(record, &segments);

    // A repeated field whose last segment is absent is an empty list, even when required.
    let absent_list = field.repeated
        && matches!(result, Lookup::Missing { depth } if depth + 1 == segments.len());

    if field.required && !absent_list {
        if let Some(depth) = result.failed_at() {
            let prefix = segments[..depth].join(&PATH_SEPARATOR.to_string());
            return Err(etl_error!(
                ErrorKind::PathNotFound,
                "Required field path not found",
                format!("path not found {} at {}", segments[depth], prefix)
            ));
        }
    }

    let value = match result {
        Lookup::Found(Value::Null) | Lookup::Missing { .. } | Lookup::NotAnObject { .. }
            if field.repeated =>
        {
            Value::Array(Vec::new())
        }
        Lookup::Found(value) => value.clone(),
        Lookup::Missing { .. } | Lookup::NotAnObject { .. } => Value::Null,
    };

    Ok(value)
}

fn truncated(raw: &str) -> String {
    const MAX_LEN: usize = 256;

    match raw.char_indices().nth(MAX_LEN) {
        Some((idx, _)) => format!("{}...", &raw[..idx]),
        None => raw.to_string(),
    }
}
