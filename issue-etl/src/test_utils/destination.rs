use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::bail;
use crate::destination::Destination;
use crate::error::{ErrorKind, EtlResult};
use crate::schema::TableSchema;
use crate::types::{FlatRecord, Watermark};

/// Destination operation a [`TestDestinationWrapper`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationOperation {
    Prepare,
    Insert,
    RecordExecution,
    LastExecution,
}

#[derive(Debug)]
struct Inner {
    calls: Vec<DestinationOperation>,
    failing: Vec<DestinationOperation>,
}

/// Wraps a destination, recording every call and failing the operations it is told to.
#[derive(Debug, Clone)]
pub struct TestDestinationWrapper<D> {
    wrapped: D,
    inner: Arc<Mutex<Inner>>,
}

impl<D> TestDestinationWrapper<D> {
    pub fn wrap(destination: D) -> Self {
        let inner = Inner {
            calls: Vec::new(),
            failing: Vec::new(),
        };

        Self {
            wrapped: destination,
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub fn wrapped(&self) -> &D {
        &self.wrapped
    }

    pub async fn fail_on(&self, operation: DestinationOperation) {
        self.inner.lock().await.failing.push(operation);
    }

    pub async fn calls(&self) -> Vec<DestinationOperation> {
        self.inner.lock().await.calls.clone()
    }

    async fn enter(&self, operation: DestinationOperation) -> EtlResult<()> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(operation);
        if inner.failing.contains(&operation) {
            bail!(
                ErrorKind::DestinationError,
                "Injected destination failure",
                format!("{operation:?}")
            );
        }

        Ok(())
    }
}

impl<D> Destination for TestDestinationWrapper<D>
where
    D: Destination + Send + Sync,
{
    async fn prepare(&self, schema: &TableSchema) -> EtlResult<()> {
        self.enter(DestinationOperation::Prepare).await?;
        self.wrapped.prepare(schema).await
    }

    async fn insert(&self, records: Vec<FlatRecord>) -> EtlResult<()> {
        self.enter(DestinationOperation::Insert).await?;
        self.wrapped.insert(records).await
    }

    async fn record_execution(&self, at: DateTime<Utc>, inserted: u64) -> EtlResult<()> {
        self.enter(DestinationOperation::RecordExecution).await?;
        self.wrapped.record_execution(at, inserted).await
    }

    async fn last_execution(&self) -> EtlResult<Option<Watermark>> {
        self.enter(DestinationOperation::LastExecution).await?;
        self.wrapped.last_execution().await
    }
}
