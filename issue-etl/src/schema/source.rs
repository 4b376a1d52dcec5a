use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::{ObjectStore, RetryConfig};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::schema::TableSchema;

const GCS_SCHEME: &str = "gs://";
const FILE_SCHEME: &str = "file://";

/// Provides the target schema of a run.
///
/// The schema is loaded once at the start of every run and stays immutable until the run ends.
pub trait SchemaSource {
    fn load_schema(&self) -> impl Future<Output = EtlResult<TableSchema>> + Send;
}

/// A fixed schema, handy when the schema is built in code.
impl SchemaSource for TableSchema {
    async fn load_schema(&self) -> EtlResult<TableSchema> {
        Ok(self.clone())
    }
}

/// Reads the schema as a JSON blob from an [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct ObjectStoreSchemaSource {
    store: Arc<dyn ObjectStore>,
    path: Path,
}

impl ObjectStoreSchemaSource {
    pub fn new(store: Arc<dyn ObjectStore>, path: Path) -> Self {
        Self { store, path }
    }

    /// Builds a schema source from a location string.
    ///
    /// Supported forms are `gs://bucket/path/to/schema.json`, `file:///abs/schema.json` and a
    /// plain filesystem path, which is resolved against the working directory when relative.
    /// GCS credentials are read from the environment, `service_account_key` overrides them.
    pub fn from_location(location: &str, service_account_key: Option<&str>) -> EtlResult<Self> {
        if let Some(rest) = location.strip_prefix(GCS_SCHEME) {
            let Some((bucket, key)) = rest.split_once('/') else {
                return Err(etl_error!(
                    ErrorKind::ConfigError,
                    "Schema location has no object key",
                    format!("`{location}` must look like gs://<bucket>/<key>")
                ));
            };

            if bucket.is_empty() || key.is_empty() {
                return Err(etl_error!(
                    ErrorKind::ConfigError,
                    "Schema location has no bucket or object key",
                    format!("`{location}` must look like gs://<bucket>/<key>")
                ));
            }

            let mut builder = GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(bucket)
                .with_retry(RetryConfig::default());

            if let Some(service_account_key) = service_account_key {
                debug!("building gcs schema source with service account key");
                builder = builder.with_service_account_key(service_account_key);
            }

            let store: Arc<dyn ObjectStore> = Arc::new(builder.build()?);

            return Ok(Self::new(store, Path::from(key)));
        }

        let local_path = location.strip_prefix(FILE_SCHEME).unwrap_or(location);
        let absolute = std::path::absolute(local_path)?;
        let path = Path::from_absolute_path(&absolute).map_err(|err| {
            etl_error!(
                ErrorKind::ConfigError,
                "Schema location is not a valid path",
                format!("`{location}`: {err}")
            )
        })?;

        Ok(Self::new(Arc::new(LocalFileSystem::new()), path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SchemaSource for ObjectStoreSchemaSource {
    async fn load_schema(&self) -> EtlResult<TableSchema> {
        let bytes = self.store.get(&self.path).await?.bytes().await?;
        let schema = TableSchema::from_json(&bytes)?;

        info!(
            path = %self.path,
            fields = schema.len(),
            "loaded target schema"
        );

        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::PutPayload;
    use object_store::memory::InMemory;

    async fn store_with(blob: &'static str) -> ObjectStoreSchemaSource {
        let store = Arc::new(InMemory::new());
        let path = Path::from("schemas/jira.json");
        store
            .put(&path, PutPayload::from_static(blob.as_bytes()))
            .await
            .unwrap();

        ObjectStoreSchemaSource::new(store, path)
    }

    #[tokio::test]
    async fn loads_schema_from_store() {
        let source = store_with(
            r#"[{"name": "key", "type": "string", "path": "key", "required": true}]"#,
        )
        .await;

        let schema = source.load_schema().await.unwrap();
        assert_eq!(schema.field_names().collect::<Vec<_>>(), vec!["key"]);
    }

    #[tokio::test]
    async fn undecodable_blob_is_fatal() {
        let source = store_with("not json").await;

        let err = source.load_schema().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSchema);
    }

    #[tokio::test]
    async fn missing_blob_is_fatal() {
        let source = ObjectStoreSchemaSource::new(
            Arc::new(InMemory::new()),
            Path::from("schemas/missing.json"),
        );

        let err = source.load_schema().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }

    #[test]
    fn parses_local_locations() {
        let source = ObjectStoreSchemaSource::from_location("file:///etc/etl/schema.json", None)
            .unwrap();
        assert_eq!(source.path().as_ref(), "etc/etl/schema.json");

        let source = ObjectStoreSchemaSource::from_location("/etc/etl/schema.json", None).unwrap();
        assert_eq!(source.path().as_ref(), "etc/etl/schema.json");
    }

    #[test]
    fn rejects_gcs_location_without_key() {
        let err = ObjectStoreSchemaSource::from_location("gs://bucket", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }
}
