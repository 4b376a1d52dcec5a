use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Where the target schema blob is read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// `gs://bucket/path/schema.json`, `file:///path/schema.json` or a plain filesystem path.
    pub location: String,
}

impl SchemaConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let location = self.location.trim();
        if location.is_empty() {
            return Err(ValidationError::MissingValue("schema.location"));
        }

        if let Some((scheme, _)) = location.split_once("://") {
            if scheme != "gs" && scheme != "file" {
                return Err(ValidationError::UnsupportedSchemaLocation(
                    location.to_string(),
                ));
            }
        }

        Ok(())
    }
}
