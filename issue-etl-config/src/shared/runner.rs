use serde::{Deserialize, Serialize};

use crate::shared::{
    DestinationConfig, PipelineConfig, SchemaConfig, SentryConfig, SourceConfig, ValidationError,
};

/// Complete configuration of the runner binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunnerConfig {
    pub source: SourceConfig,
    pub schema: SchemaConfig,
    pub destination: DestinationConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Enables error reporting to Sentry when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentry: Option<SentryConfig>,
}

impl RunnerConfig {
    /// Checks that every mandatory value is present and well formed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.source.validate()?;
        self.schema.validate()?;
        self.destination.validate()?;

        Ok(())
    }
}
