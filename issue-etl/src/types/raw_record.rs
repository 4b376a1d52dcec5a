use serde_json::{Map, Value};

/// Name of the top-level field that identifies every source record.
pub const RECORD_KEY_FIELD: &str = "key";

/// A record as returned by the source, an arbitrarily nested JSON object.
///
/// Raw records are read-only input for the extractor; the pipeline never mutates them.
pub type RawRecord = Map<String, Value>;

/// Returns the identifying key of a raw record, if present.
///
/// String keys are returned verbatim, any other JSON value is rendered in its compact form.
pub fn record_key(record: &RawRecord) -> Option<String> {
    match record.get(RECORD_KEY_FIELD)? {
        Value::String(key) => Some(key.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_keys_are_returned_verbatim() {
        let record = json!({"key": "PROJ-1"}).as_object().unwrap().clone();
        assert_eq!(record_key(&record), Some("PROJ-1".to_string()));
    }

    #[test]
    fn non_string_keys_are_rendered() {
        let record = json!({"key": 10042}).as_object().unwrap().clone();
        assert_eq!(record_key(&record), Some("10042".to_string()));
    }

    #[test]
    fn missing_key_yields_none() {
        let record = json!({"id": "10042"}).as_object().unwrap().clone();
        assert_eq!(record_key(&record), None);
    }
}
