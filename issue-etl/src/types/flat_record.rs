use serde::Serialize;
use serde_json::{Map, Value};

/// A record reshaped into the flat target schema.
///
/// [`FlatRecord`] holds exactly one value per declared schema field, in declaration order. The
/// key of the source record is kept alongside for logging but is not part of the serialized row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRecord {
    #[serde(skip)]
    key: String,
    #[serde(flatten)]
    values: Map<String, Value>,
}

impl FlatRecord {
    /// Creates an empty flat record for the source record identified by `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: Map::new(),
        }
    }

    /// Sets the value of a field, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Returns the key of the source record this row was extracted from.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the value of `name`, if the field is part of the record.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns the field values in declaration order.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Consumes the record and returns its field values.
    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }

    /// Returns the field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
