use chrono::{DateTime, Utc};
use std::future::Future;

use crate::error::EtlResult;
use crate::schema::TableSchema;
use crate::types::{FlatRecord, Watermark};

/// Suffix appended to the data table name to form the execution ledger table name.
pub const EXECUTIONS_TABLE_SUFFIX: &str = "_executions";

/// Returns the name of the execution ledger table belonging to `table`.
pub fn executions_table_name(table: &str) -> String {
    format!("{table}{EXECUTIONS_TABLE_SUFFIX}")
}

/// Table store receiving extracted records, which also keeps the execution ledger.
///
/// Implementations treat "already exists" as success in [`Destination::prepare`] so every run
/// can call it unconditionally.
pub trait Destination {
    /// Creates the dataset, the data table for `schema` and the execution ledger table.
    fn prepare(&self, schema: &TableSchema) -> impl Future<Output = EtlResult<()>> + Send;

    /// Appends `records` as one batch.
    ///
    /// The batch is all-or-nothing: if any row is rejected, none is stored and the returned error
    /// aggregates the cause of every rejected row.
    fn insert(&self, records: Vec<FlatRecord>) -> impl Future<Output = EtlResult<()>> + Send;

    /// Appends a ledger row stating that the run started at `at` fetched `inserted` records.
    fn record_execution(
        &self,
        at: DateTime<Utc>,
        inserted: u64,
    ) -> impl Future<Output = EtlResult<()>> + Send;

    /// Returns the newest ledger row, or `None` when the ledger is empty.
    fn last_execution(&self) -> impl Future<Output = EtlResult<Option<Watermark>>> + Send;
}
