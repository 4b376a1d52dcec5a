use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{ErrorKind, EtlError, EtlResult};
use crate::{bail, etl_error};

/// Separator between the segments of a [`FieldSchema::path`].
pub const PATH_SEPARATOR: char = '.';

/// Declarative description of one target field.
///
/// `path` addresses a value inside a nested source record by dot-separated keys, `name` is the
/// column the value ends up in. The JSON representation matches the schema blob consumed by the
/// pipeline: `{"name": .., "type": .., "path": .., "required": .., "repeated": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub typ: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub repeated: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl FieldSchema {
    /// Creates an optional, non-repeated field.
    pub fn new(name: impl Into<String>, typ: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            typ: typ.into(),
            path: path.into(),
            required: false,
            repeated: false,
        }
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_repeated(mut self, repeated: bool) -> Self {
        self.repeated = repeated;
        self
    }

    /// Splits the path into its traversal steps.
    pub fn path_segments(&self) -> Vec<&str> {
        self.path.split(PATH_SEPARATOR).collect()
    }

    /// Returns the analytical column type of this field.
    pub fn field_type(&self) -> EtlResult<FieldType> {
        self.typ.parse()
    }

    fn validate(&self) -> EtlResult<()> {
        if self.name.is_empty() {
            bail!(
                ErrorKind::InvalidSchema,
                "Schema field has no name",
                format!("field with path `{}` has an empty name", self.path)
            );
        }

        if self.path.is_empty() {
            bail!(
                ErrorKind::InvalidSchema,
                "Schema field has no path",
                format!("field `{}` has an empty path", self.name)
            );
        }

        if self.path_segments().iter().any(|segment| segment.is_empty()) {
            bail!(
                ErrorKind::InvalidSchema,
                "Schema field path contains an empty segment",
                format!("field `{}` has path `{}`", self.name, self.path)
            );
        }

        self.field_type()?;

        Ok(())
    }
}

/// Analytical column type a schema field maps to.
///
/// Parsed case-insensitively from [`FieldSchema::typ`], accepting both the legacy and the
/// standard SQL spelling where the table store has two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Bytes,
    Integer,
    Float,
    Numeric,
    BigNumeric,
    Boolean,
    Timestamp,
    Date,
    Time,
    DateTime,
    Record,
    Geography,
    Json,
}

impl FromStr for FieldType {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let typ = match s.to_uppercase().as_str() {
            "STRING" => FieldType::String,
            "BYTES" => FieldType::Bytes,
            "INTEGER" | "INT64" => FieldType::Integer,
            "FLOAT" | "FLOAT64" => FieldType::Float,
            "NUMERIC" => FieldType::Numeric,
            "BIGNUMERIC" => FieldType::BigNumeric,
            "BOOLEAN" | "BOOL" => FieldType::Boolean,
            "TIMESTAMP" => FieldType::Timestamp,
            "DATE" => FieldType::Date,
            "TIME" => FieldType::Time,
            "DATETIME" => FieldType::DateTime,
            "RECORD" | "STRUCT" => FieldType::Record,
            "GEOGRAPHY" => FieldType::Geography,
            "JSON" => FieldType::Json,
            _ => {
                return Err(etl_error!(
                    ErrorKind::InvalidSchema,
                    "Unsupported schema field type",
                    format!("`{s}` is not a known column type")
                ));
            }
        };

        Ok(typ)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "STRING",
            FieldType::Bytes => "BYTES",
            FieldType::Integer => "INTEGER",
            FieldType::Float => "FLOAT",
            FieldType::Numeric => "NUMERIC",
            FieldType::BigNumeric => "BIGNUMERIC",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Timestamp => "TIMESTAMP",
            FieldType::Date => "DATE",
            FieldType::Time => "TIME",
            FieldType::DateTime => "DATETIME",
            FieldType::Record => "RECORD",
            FieldType::Geography => "GEOGRAPHY",
            FieldType::Json => "JSON",
        };

        f.write_str(name)
    }
}

/// A validated, ordered list of [`FieldSchema`] entries.
///
/// Construction rejects empty names or paths, unknown types and duplicate names, so a
/// [`TableSchema`] can be used by the extractor and the destinations without further checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TableSchema {
    fields: Vec<FieldSchema>,
}

impl TableSchema {
    pub fn new(fields: Vec<FieldSchema>) -> EtlResult<Self> {
        let mut names = HashSet::with_capacity(fields.len());
        for field in &fields {
            field.validate()?;

            if !names.insert(field.name.as_str()) {
                bail!(
                    ErrorKind::InvalidSchema,
                    "Duplicate schema field name",
                    format!("field `{}` is declared more than once", field.name)
                );
            }
        }

        Ok(Self { fields })
    }

    /// Decodes and validates a schema from its JSON representation (an array of fields).
    pub fn from_json(bytes: &[u8]) -> EtlResult<Self> {
        let fields: Vec<FieldSchema> = serde_json::from_slice(bytes).map_err(|err| {
            etl_error!(
                ErrorKind::InvalidSchema,
                "Schema could not be decoded",
                err
            )
        })?;

        Self::new(fields)
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_schema_blob() {
        let blob = br#"[
            {"name": "key", "type": "string", "path": "key", "required": true},
            {"name": "labels", "type": "STRING", "path": "fields.labels", "repeated": true},
            {"name": "created", "type": "timestamp", "path": "fields.created"}
        ]"#;

        let schema = TableSchema::from_json(blob).unwrap();

        assert_eq!(schema.len(), 3);
        assert_eq!(
            schema.fields()[0],
            FieldSchema::new("key", "string", "key").with_required(true)
        );
        assert!(schema.fields()[1].repeated);
        assert!(!schema.fields()[2].required);
        assert_eq!(
            schema.field_names().collect::<Vec<_>>(),
            vec!["key", "labels", "created"]
        );
    }

    #[test]
    fn serializes_without_default_flags() {
        let field = FieldSchema::new("summary", "string", "fields.summary");
        assert_eq!(
            serde_json::to_string(&field).unwrap(),
            r#"{"name":"summary","type":"string","path":"fields.summary"}"#
        );
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = TableSchema::new(vec![
            FieldSchema::new("status", "string", "fields.status.name"),
            FieldSchema::new("status", "string", "fields.status.id"),
        ])
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidSchema);
        assert_eq!(
            err.detail(),
            Some("field `status` is declared more than once")
        );
    }

    #[test]
    fn rejects_empty_paths_and_segments() {
        let err = TableSchema::new(vec![FieldSchema::new("status", "string", "")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSchema);

        let err = TableSchema::new(vec![FieldSchema::new("status", "string", "fields..name")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSchema);
    }

    #[test]
    fn rejects_unknown_types() {
        let err =
            TableSchema::new(vec![FieldSchema::new("status", "varchar", "fields.status")])
                .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSchema);
    }

    #[test]
    fn rejects_undecodable_blob() {
        let err = TableSchema::from_json(b"{\"name\": \"key\"}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSchema);
    }

    #[test]
    fn parses_types_case_insensitively() {
        assert_eq!("string".parse::<FieldType>().unwrap(), FieldType::String);
        assert_eq!("Int64".parse::<FieldType>().unwrap(), FieldType::Integer);
        assert_eq!("BOOL".parse::<FieldType>().unwrap(), FieldType::Boolean);
        assert_eq!("struct".parse::<FieldType>().unwrap(), FieldType::Record);
        assert_eq!(FieldType::Timestamp.to_string(), "TIMESTAMP");
    }

    #[test]
    fn splits_paths_into_segments() {
        let field = FieldSchema::new("assignee", "string", "fields.assignee.name");
        assert_eq!(field.path_segments(), vec!["fields", "assignee", "name"]);
    }
}
