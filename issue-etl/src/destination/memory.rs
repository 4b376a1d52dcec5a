use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::destination::base::Destination;
use crate::error::{ErrorKind, EtlError, EtlResult};
use crate::schema::TableSchema;
use crate::types::{FlatRecord, Watermark};
use crate::{bail, etl_error};

#[derive(Debug, Default)]
struct Inner {
    schema: Option<TableSchema>,
    rows: Vec<FlatRecord>,
    executions: Vec<Watermark>,
}

/// In-process [`Destination`].
///
/// Behaves like a table store: tables only exist after [`Destination::prepare`], required
/// columns reject `null` and repeated columns only accept arrays. Cloning shares the storage.
#[derive(Debug, Clone)]
pub struct MemoryDestination {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Returns the schema the data table was created with.
    pub async fn schema(&self) -> Option<TableSchema> {
        self.inner.lock().await.schema.clone()
    }

    pub async fn rows(&self) -> Vec<FlatRecord> {
        self.inner.lock().await.rows.clone()
    }

    /// Returns the execution ledger in insertion order.
    pub async fn executions(&self) -> Vec<Watermark> {
        self.inner.lock().await.executions.clone()
    }
}

impl Default for MemoryDestination {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_row(schema: &TableSchema, index: usize, row: &FlatRecord) -> Result<(), EtlError> {
    for field in schema.fields() {
        let value = row.get(&field.name).unwrap_or(&Value::Null);

        if field.repeated {
            if !value.is_array() {
                return Err(etl_error!(
                    ErrorKind::InvalidData,
                    "Row rejected",
                    format!(
                        "row {index} ({}): repeated column `{}` is not an array",
                        row.key(),
                        field.name
                    )
                ));
            }
        } else if field.required && value.is_null() {
            return Err(etl_error!(
                ErrorKind::InvalidData,
                "Row rejected",
                format!(
                    "row {index} ({}): required column `{}` is null",
                    row.key(),
                    field.name
                )
            ));
        }
    }

    Ok(())
}

impl Destination for MemoryDestination {
    async fn prepare(&self, schema: &TableSchema) -> EtlResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.schema.is_some() {
            info!("tables already exist, keeping the existing schema");
            return Ok(());
        }

        info!(fields = schema.len(), "creating tables");
        inner.schema = Some(schema.clone());

        Ok(())
    }

    async fn insert(&self, records: Vec<FlatRecord>) -> EtlResult<()> {
        let mut inner = self.inner.lock().await;
        let Some(schema) = &inner.schema else {
            bail!(
                ErrorKind::DestinationError,
                "Data table does not exist"
            );
        };

        let errors: Vec<EtlError> = records
            .iter()
            .enumerate()
            .filter_map(|(index, row)| validate_row(schema, index, row).err())
            .collect();

        if !errors.is_empty() {
            return Err(EtlError::many(errors));
        }

        info!(count = records.len(), "inserting rows");
        inner.rows.extend(records);

        Ok(())
    }

    async fn record_execution(&self, at: DateTime<Utc>, inserted: u64) -> EtlResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.schema.is_none() {
            bail!(
                ErrorKind::DestinationError,
                "Execution table does not exist"
            );
        }

        info!(timestamp = %at, inserted, "recording execution");
        inner.executions.push(Watermark::new(at, inserted));

        Ok(())
    }

    async fn last_execution(&self) -> EtlResult<Option<Watermark>> {
        let inner = self.inner.lock().await;
        if inner.schema.is_none() {
            bail!(
                ErrorKind::DestinationQueryFailed,
                "Execution table does not exist"
            );
        }

        Ok(inner
            .executions
            .iter()
            .max_by_key(|execution| execution.timestamp)
            .copied())
    }
}
