use serde::{Deserialize, Serialize};

use crate::SerializableSecretString;
use crate::shared::ValidationError;

/// Number of issues requested per search page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// Connection settings of the issue tracker the pipeline reads from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base url of the tracker, e.g. `https://jira.example.com`.
    pub url: String,
    /// User for HTTP basic authentication.
    pub username: String,
    /// Password or API token for HTTP basic authentication.
    pub password: SerializableSecretString,
    /// Key of the project whose issues are synchronized.
    pub project: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl SourceConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::MissingValue("source.url"));
        }

        if let Err(err) = url::Url::parse(&self.url) {
            return Err(ValidationError::InvalidSourceUrl(err.to_string()));
        }

        if self.username.trim().is_empty() {
            return Err(ValidationError::MissingValue("source.username"));
        }

        if self.password.is_blank() {
            return Err(ValidationError::MissingValue("source.password"));
        }

        if self.project.trim().is_empty() {
            return Err(ValidationError::MissingValue("source.project"));
        }

        if self.page_size == 0 {
            return Err(ValidationError::PageSizeZero);
        }

        Ok(())
    }
}
