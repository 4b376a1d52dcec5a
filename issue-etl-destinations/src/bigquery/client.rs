use gcp_bigquery_client::client_builder::ClientBuilder;
use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::model::dataset::Dataset;
use gcp_bigquery_client::model::field_type::FieldType as BigQueryFieldType;
use gcp_bigquery_client::model::query_request::QueryRequest;
use gcp_bigquery_client::model::query_response::ResultSet;
use gcp_bigquery_client::model::table::Table;
use gcp_bigquery_client::model::table_data_insert_all_request::TableDataInsertAllRequest;
use gcp_bigquery_client::model::table_data_insert_all_response_insert_errors::TableDataInsertAllResponseInsertErrors;
use gcp_bigquery_client::model::table_field_schema::TableFieldSchema;
use gcp_bigquery_client::yup_oauth2::parse_service_account_key;
use gcp_bigquery_client::Client;
use issue_etl::error::{ErrorKind, EtlError, EtlResult};
use issue_etl::etl_error;
use issue_etl::schema::{FieldSchema, FieldType};
use serde_json::{Map, Value};
use std::fmt;
use tracing::info;

const MODE_REQUIRED: &str = "REQUIRED";
const MODE_REPEATED: &str = "REPEATED";
const MODE_NULLABLE: &str = "NULLABLE";

pub type BigQueryProjectId = String;
pub type BigQueryDatasetId = String;
pub type BigQueryTableId = String;

/// A client for the BigQuery REST API, bound to one project.
#[derive(Clone)]
pub struct BigQueryClient {
    project_id: BigQueryProjectId,
    client: Client,
}

impl BigQueryClient {
    /// Creates a new [`BigQueryClient`] from a Google Cloud service account key (JSON).
    pub async fn new_with_key(
        project_id: BigQueryProjectId,
        sa_key: &str,
    ) -> EtlResult<BigQueryClient> {
        let sa_key = parse_service_account_key(sa_key)
            .map_err(BQError::from)
            .map_err(bq_error_to_etl_error)?;
        let client = Client::from_service_account_key(sa_key, false)
            .await
            .map_err(bq_error_to_etl_error)?;

        Ok(BigQueryClient { project_id, client })
    }

    /// Creates a new [`BigQueryClient`] talking to custom authentication and API endpoints.
    pub async fn new_with_urls(
        project_id: BigQueryProjectId,
        auth_base_url: String,
        v2_base_url: String,
        sa_key: &str,
    ) -> EtlResult<BigQueryClient> {
        let sa_key = parse_service_account_key(sa_key)
            .map_err(BQError::from)
            .map_err(bq_error_to_etl_error)?;
        let client = ClientBuilder::new()
            .with_auth_base_url(auth_base_url)
            .with_v2_base_url(v2_base_url)
            .build_from_service_account_key(sa_key, false)
            .await
            .map_err(bq_error_to_etl_error)?;

        Ok(BigQueryClient { project_id, client })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Returns the full BigQuery table name in the form `project_id.dataset_id.table_id`.
    pub fn full_table_name(&self, dataset_id: &str, table_id: &str) -> String {
        format!("`{}.{}.{}`", self.project_id, dataset_id, table_id)
    }

    /// Creates a dataset unless it already exists.
    ///
    /// Returns `true` if the dataset was created.
    pub async fn create_dataset_if_missing(&self, dataset_id: &str) -> EtlResult<bool> {
        info!("creating dataset {}.{dataset_id} in BigQuery", self.project_id);

        let result = self
            .client
            .dataset()
            .create(Dataset::new(&self.project_id, dataset_id))
            .await;

        created_or_existing(result)
    }

    /// Creates a table unless it already exists.
    ///
    /// An existing table is kept as is, even when its schema differs from `table`.
    pub async fn create_table_if_missing(&self, table: Table) -> EtlResult<bool> {
        let table_id = table.table_reference.table_id.clone();
        info!("creating table {table_id} in BigQuery");

        let result = self.client.table().create(table).await;

        created_or_existing(result)
    }

    /// Appends `rows` to a table with a single streaming insert.
    ///
    /// Columns unknown to the table are dropped. BigQuery rejects the whole request when a row is
    /// invalid, the returned error lists every rejected row.
    pub async fn insert_rows(
        &self,
        dataset_id: &str,
        table_id: &str,
        rows: Vec<Map<String, Value>>,
    ) -> EtlResult<()> {
        let mut request = TableDataInsertAllRequest::new();
        request.ignore_unknown_values();
        for row in rows {
            request
                .add_row(None, row)
                .map_err(bq_error_to_etl_error)?;
        }

        let response = self
            .client
            .tabledata()
            .insert_all(&self.project_id, dataset_id, table_id, request)
            .await
            .map_err(bq_error_to_etl_error)?;

        match response.insert_errors {
            Some(insert_errors) if !insert_errors.is_empty() => {
                let errors = insert_errors
                    .into_iter()
                    .map(insert_error_to_etl_error)
                    .collect::<Vec<_>>();

                Err(EtlError::many(errors))
            }
            _ => Ok(()),
        }
    }

    /// Executes an SQL query and returns the result set.
    pub async fn query(&self, request: QueryRequest) -> EtlResult<ResultSet> {
        let query_response = self
            .client
            .job()
            .query(&self.project_id, request)
            .await
            .map_err(bq_error_to_etl_error)?;

        Ok(ResultSet::new_from_query_response(query_response))
    }

    /// Converts a schema field into a BigQuery column definition.
    pub fn field_schema_to_bigquery(field: &FieldSchema) -> EtlResult<TableFieldSchema> {
        let typ = match field.field_type()? {
            FieldType::String => BigQueryFieldType::String,
            FieldType::Bytes => BigQueryFieldType::Bytes,
            FieldType::Integer => BigQueryFieldType::Integer,
            FieldType::Float => BigQueryFieldType::Float,
            FieldType::Numeric => BigQueryFieldType::Numeric,
            FieldType::BigNumeric => BigQueryFieldType::Bignumeric,
            FieldType::Boolean => BigQueryFieldType::Boolean,
            FieldType::Timestamp => BigQueryFieldType::Timestamp,
            FieldType::Date => BigQueryFieldType::Date,
            FieldType::Time => BigQueryFieldType::Time,
            FieldType::DateTime => BigQueryFieldType::Datetime,
            FieldType::Record => BigQueryFieldType::Record,
            FieldType::Geography => BigQueryFieldType::Geography,
            FieldType::Json => BigQueryFieldType::Json,
        };

        let mut column = TableFieldSchema::new(&field.name, typ);
        column.mode = Some(Self::column_mode(field).to_string());

        Ok(column)
    }

    /// Returns the column mode of a field, repetition wins over requiredness.
    fn column_mode(field: &FieldSchema) -> &'static str {
        if field.repeated {
            MODE_REPEATED
        } else if field.required {
            MODE_REQUIRED
        } else {
            MODE_NULLABLE
        }
    }
}

impl fmt::Debug for BigQueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigQueryClient")
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// Maps an "already exists" answer to `Ok(false)`.
fn created_or_existing<T>(result: Result<T, BQError>) -> EtlResult<bool> {
    match result {
        Ok(_) => Ok(true),
        // 409 Conflict
        Err(BQError::ResponseError { error }) if error.error.code == 409 => {
            info!("already exists, keeping it");
            Ok(false)
        }
        Err(err) => Err(bq_error_to_etl_error(err)),
    }
}

/// Converts [`BQError`] to [`EtlError`] with appropriate error kind.
fn bq_error_to_etl_error(err: BQError) -> EtlError {
    let (kind, description) = match &err {
        BQError::InvalidServiceAccountKey(_) => (
            ErrorKind::AuthenticationError,
            "Invalid BigQuery service account key",
        ),
        BQError::InvalidServiceAccountAuthenticator(_) => (
            ErrorKind::AuthenticationError,
            "Invalid BigQuery service account authenticator",
        ),
        BQError::AuthError(_) | BQError::YupAuthError(_) => (
            ErrorKind::AuthenticationError,
            "BigQuery authentication error",
        ),
        BQError::NoToken => (
            ErrorKind::AuthenticationError,
            "BigQuery authentication token missing",
        ),
        BQError::RequestError(_) => (
            ErrorKind::DestinationConnectionFailed,
            "BigQuery request failed",
        ),
        BQError::ResponseError { error } if error.error.code == 403 => {
            (ErrorKind::PermissionDenied, "BigQuery permission denied")
        }
        BQError::ResponseError { .. } => (
            ErrorKind::DestinationQueryFailed,
            "BigQuery response error",
        ),
        BQError::NoDataAvailable => (
            ErrorKind::InvalidState,
            "BigQuery result set positioning error",
        ),
        BQError::InvalidColumnIndex { .. } | BQError::InvalidColumnName { .. } => {
            (ErrorKind::InvalidData, "BigQuery invalid column")
        }
        BQError::InvalidColumnType { .. } => {
            (ErrorKind::ConversionError, "BigQuery column type mismatch")
        }
        BQError::SerializationError(_) => (
            ErrorKind::SerializationError,
            "BigQuery JSON serialization error",
        ),
        _ => (ErrorKind::DestinationError, "BigQuery error"),
    };

    etl_error!(kind, description, err.to_string())
}

/// Converts the errors BigQuery reported for one row into an [`EtlError`].
fn insert_error_to_etl_error(err: TableDataInsertAllResponseInsertErrors) -> EtlError {
    let row = err
        .index
        .map(|index| index.to_string())
        .unwrap_or_else(|| "?".to_string());
    let causes = err
        .errors
        .unwrap_or_default()
        .into_iter()
        .map(|cause| {
            format!(
                "{}: {}",
                cause.reason.unwrap_or_default(),
                cause.message.unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    etl_error!(
        ErrorKind::InvalidData,
        "Row rejected",
        format!("row {row}: {causes}")
    )
}
