use serde_json::{Map, Value};

/// Result of walking a dotted path through a nested record.
///
/// `depth` is the index of the segment at which the walk stopped, so `segments[depth]` is the
/// offending segment and `segments[..depth]` is the prefix that was traversed successfully.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    /// Every segment resolved; carries the final value, which may be `null`.
    Found(&'a Value),
    /// The key at `depth` is not present in the object reached so far.
    Missing { depth: usize },
    /// The value at `depth` is not an object, so the segments after it cannot be resolved.
    NotAnObject { depth: usize },
}

impl Lookup<'_> {
    /// Index of the segment at which the walk failed.
    pub fn failed_at(&self) -> Option<usize> {
        match self {
            Lookup::Found(_) => None,
            Lookup::Missing { depth } | Lookup::NotAnObject { depth } => Some(*depth),
        }
    }
}

/// Walks `segments` through `object`.
pub fn lookup<'a>(object: &'a Map<String, Value>, segments: &[&str]) -> Lookup<'a> {
    walk(object, segments, 0)
}

fn walk<'a>(object: &'a Map<String, Value>, segments: &[&str], depth: usize) -> Lookup<'a> {
    let Some(segment) = segments.get(depth) else {
        return Lookup::Missing { depth };
    };

    let Some(value) = object.get(*segment) else {
        return Lookup::Missing { depth };
    };

    if depth + 1 == segments.len() {
        return Lookup::Found(value);
    }

    match value {
        Value::Object(inner) => walk(inner, segments, depth + 1),
        _ => Lookup::NotAnObject { depth },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn resolves_nested_values() {
        let record = record(json!({"fields": {"status": {"name": "Done"}}}));

        assert_eq!(
            lookup(&record, &["fields", "status", "name"]),
            Lookup::Found(&json!("Done"))
        );
    }

    #[test]
    fn reports_missing_segment() {
        let record = record(json!({"fields": {"summary": "Broken"}}));

        let result = lookup(&record, &["fields", "status", "name"]);
        assert_eq!(result, Lookup::Missing { depth: 1 });
        assert_eq!(result.failed_at(), Some(1));
    }

    #[test]
    fn reports_non_object_intermediate() {
        let record = record(json!({"fields": {"status": "Done"}}));

        assert_eq!(
            lookup(&record, &["fields", "status", "name"]),
            Lookup::NotAnObject { depth: 1 }
        );

        let record = self::record(json!({"fields": {"status": null}}));
        assert_eq!(
            lookup(&record, &["fields", "status", "name"]),
            Lookup::NotAnObject { depth: 1 }
        );
    }

    #[test]
    fn explicit_null_is_found() {
        let record = record(json!({"fields": {"assignee": null}}));

        let result = lookup(&record, &["fields", "assignee"]);
        assert_eq!(result, Lookup::Found(&Value::Null));
        assert_eq!(result.failed_at(), None);
    }
}
