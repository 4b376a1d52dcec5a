use chrono::{DateTime, Utc};
use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::model::field_type::FieldType as BigQueryFieldType;
use gcp_bigquery_client::model::query_request::QueryRequest;
use gcp_bigquery_client::model::table::Table;
use gcp_bigquery_client::model::table_field_schema::TableFieldSchema;
use gcp_bigquery_client::model::table_schema::TableSchema as BigQueryTableSchema;
use gcp_bigquery_client::model::time_partitioning::TimePartitioning;
use issue_etl::destination::{Destination, executions_table_name};
use issue_etl::error::{ErrorKind, EtlResult};
use issue_etl::etl_error;
use issue_etl::schema::TableSchema;
use issue_etl::types::{FlatRecord, Watermark};
use metrics::{gauge, histogram};
use serde_json::{Map, Value};
use std::time::Instant;
use tracing::{debug, info};

use crate::bigquery::client::{
    BigQueryClient, BigQueryDatasetId, BigQueryProjectId, BigQueryTableId,
};
use crate::bigquery::encoding::{encode_row, utc_to_bigquery};
use crate::metrics::{BQ_INSERT_DURATION_MILLISECONDS, BQ_INSERT_ROWS, register_metrics};

/// Ledger column holding the start of a run.
const TIMESTAMP_COLUMN: &str = "timestamp";
/// Ledger column holding the number of records a run fetched.
const INSERTED_COLUMN: &str = "inserted";

/// A BigQuery destination that implements the ETL [`Destination`] trait.
///
/// Issues are appended to `project_id.dataset_id.table_id` with streaming inserts. The execution
/// ledger lives next to it in `<table_id>_executions`, partitioned by day on its `timestamp`
/// column.
#[derive(Debug, Clone)]
pub struct BigQueryDestination {
    client: BigQueryClient,
    dataset_id: BigQueryDatasetId,
    table_id: BigQueryTableId,
}

impl BigQueryDestination {
    /// Creates a new [`BigQueryDestination`] authenticated with a service account key (JSON).
    pub async fn new_with_key(
        project_id: BigQueryProjectId,
        dataset_id: BigQueryDatasetId,
        table_id: BigQueryTableId,
        sa_key: &str,
    ) -> EtlResult<Self> {
        register_metrics();

        let client = BigQueryClient::new_with_key(project_id, sa_key).await?;

        Ok(Self {
            client,
            dataset_id,
            table_id,
        })
    }

    /// Creates a new [`BigQueryDestination`] using custom authentication and API endpoints.
    pub async fn new_with_urls(
        project_id: BigQueryProjectId,
        dataset_id: BigQueryDatasetId,
        table_id: BigQueryTableId,
        auth_base_url: String,
        v2_base_url: String,
        sa_key: &str,
    ) -> EtlResult<Self> {
        register_metrics();

        let client =
            BigQueryClient::new_with_urls(project_id, auth_base_url, v2_base_url, sa_key).await?;

        Ok(Self {
            client,
            dataset_id,
            table_id,
        })
    }

    fn executions_table_id(&self) -> BigQueryTableId {
        executions_table_name(&self.table_id)
    }

    /// Builds the data table definition for `schema`.
    fn data_table(&self, schema: &TableSchema) -> EtlResult<Table> {
        let columns = schema
            .fields()
            .iter()
            .map(BigQueryClient::field_schema_to_bigquery)
            .collect::<EtlResult<Vec<_>>>()?;

        Ok(Table::new(
            self.client.project_id(),
            &self.dataset_id,
            &self.table_id,
            BigQueryTableSchema::new(columns),
        ))
    }

    /// Builds the execution ledger table definition.
    fn executions_table(&self) -> Table {
        let mut timestamp = TableFieldSchema::new(TIMESTAMP_COLUMN, BigQueryFieldType::Timestamp);
        timestamp.mode = Some("REQUIRED".to_string());
        let mut inserted = TableFieldSchema::new(INSERTED_COLUMN, BigQueryFieldType::Integer);
        inserted.mode = Some("REQUIRED".to_string());

        Table::new(
            self.client.project_id(),
            &self.dataset_id,
            &self.executions_table_id(),
            BigQueryTableSchema::new(vec![timestamp, inserted]),
        )
        .time_partitioning(TimePartitioning::per_day().field(TIMESTAMP_COLUMN))
    }

    fn last_execution_query(&self) -> String {
        let full_table_name = self
            .client
            .full_table_name(&self.dataset_id, &self.executions_table_id());

        format!(
            "select unix_micros(`{TIMESTAMP_COLUMN}`) as `{TIMESTAMP_COLUMN}`, `{INSERTED_COLUMN}` \
             from {full_table_name} order by `{TIMESTAMP_COLUMN}` desc limit 1"
        )
    }
}

impl Destination for BigQueryDestination {
    async fn prepare(&self, schema: &TableSchema) -> EtlResult<()> {
        let data_table = self.data_table(schema)?;

        self.client
            .create_dataset_if_missing(&self.dataset_id)
            .await?;
        self.client.create_table_if_missing(data_table).await?;
        self.client
            .create_table_if_missing(self.executions_table())
            .await?;

        Ok(())
    }

    async fn insert(&self, records: Vec<FlatRecord>) -> EtlResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let rows = records.into_iter().map(encode_row).collect::<Vec<_>>();
        let rows_count = rows.len();

        info!(count = rows_count, table = %self.table_id, "inserting rows into BigQuery");

        let before_sending = Instant::now();
        self.client
            .insert_rows(&self.dataset_id, &self.table_id, rows)
            .await?;

        gauge!(BQ_INSERT_ROWS).set(rows_count as f64);
        histogram!(BQ_INSERT_DURATION_MILLISECONDS)
            .record(before_sending.elapsed().as_millis() as f64);

        Ok(())
    }

    async fn record_execution(&self, at: DateTime<Utc>, inserted: u64) -> EtlResult<()> {
        let mut row = Map::new();
        row.insert(
            TIMESTAMP_COLUMN.to_string(),
            Value::String(utc_to_bigquery(at)),
        );
        row.insert(INSERTED_COLUMN.to_string(), Value::from(inserted));

        info!(timestamp = %at, inserted, "recording execution in BigQuery");

        self.client
            .insert_rows(&self.dataset_id, &self.executions_table_id(), vec![row])
            .await
    }

    async fn last_execution(&self) -> EtlResult<Option<Watermark>> {
        let query = self.last_execution_query();
        debug!(%query, "reading last execution");

        let mut result_set = self.client.query(QueryRequest::new(query)).await?;
        if !result_set.next_row() {
            return Ok(None);
        }

        let read_error = |err: BQError| {
            etl_error!(
                ErrorKind::DestinationQueryFailed,
                "Execution ledger row could not be read",
                err
            )
        };

        let Some(micros) = result_set
            .get_i64_by_name(TIMESTAMP_COLUMN)
            .map_err(read_error)?
        else {
            return Ok(None);
        };
        let inserted = result_set
            .get_i64_by_name(INSERTED_COLUMN)
            .map_err(read_error)?
            .unwrap_or_default();

        let timestamp = DateTime::from_timestamp_micros(micros).ok_or_else(|| {
            etl_error!(
                ErrorKind::InvalidData,
                "Execution ledger timestamp is out of range",
                format!("{micros} microseconds")
            )
        })?;

        Ok(Some(Watermark::new(
            timestamp,
            u64::try_from(inserted).unwrap_or_default(),
        )))
    }
}
