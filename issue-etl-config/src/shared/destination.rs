use serde::{Deserialize, Serialize};

use crate::SerializableSecretString;
use crate::shared::ValidationError;

/// Table store the extracted issues are written to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationConfig {
    /// In-process destination, nothing outlives the run.
    Memory,
    /// Google BigQuery.
    ///
    /// Issues land in `project_id.dataset_id.table_id`, the execution ledger in
    /// `project_id.dataset_id.<table_id>_executions`.
    BigQuery {
        project_id: String,
        dataset_id: String,
        table_id: String,
        /// Service account key (JSON) used to authenticate with BigQuery.
        service_account_key: SerializableSecretString,
    },
}

impl DestinationConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            DestinationConfig::Memory => Ok(()),
            DestinationConfig::BigQuery {
                project_id,
                dataset_id,
                table_id,
                service_account_key,
            } => {
                if project_id.trim().is_empty() {
                    return Err(ValidationError::MissingValue(
                        "destination.big_query.project_id",
                    ));
                }
                if dataset_id.trim().is_empty() {
                    return Err(ValidationError::MissingValue(
                        "destination.big_query.dataset_id",
                    ));
                }
                if table_id.trim().is_empty() {
                    return Err(ValidationError::MissingValue(
                        "destination.big_query.table_id",
                    ));
                }
                if service_account_key.is_blank() {
                    return Err(ValidationError::MissingValue(
                        "destination.big_query.service_account_key",
                    ));
                }

                Ok(())
            }
        }
    }
}
