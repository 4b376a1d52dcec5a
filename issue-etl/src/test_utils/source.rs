use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::source::Source;
use crate::source::pagination::{SearchPage, collect_pages};
use crate::types::RawRecord;

#[derive(Debug, Default)]
struct Inner {
    records: Vec<RawRecord>,
    requests: Vec<(String, Option<DateTime<Utc>>)>,
    page_requests: usize,
    fail: bool,
}

/// [`Source`] serving fixed records through the regular pagination loop.
///
/// Every call is recorded, so tests can assert which lower bound a run used.
#[derive(Debug, Clone)]
pub struct PagedMemorySource {
    page_size: u64,
    inner: Arc<Mutex<Inner>>,
}

impl PagedMemorySource {
    pub fn new(records: Vec<RawRecord>, page_size: u64) -> Self {
        let inner = Inner {
            records,
            ..Inner::default()
        };

        Self {
            page_size,
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Makes every following fetch fail with [`ErrorKind::SourceQueryFailed`].
    pub fn fail_fetches(&self) {
        self.inner.lock().unwrap().fail = true;
    }

    /// Returns the `(project, watermark)` pairs fetches were requested with.
    pub fn requests(&self) -> Vec<(String, Option<DateTime<Utc>>)> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Returns how many pages were served.
    pub fn page_requests(&self) -> usize {
        self.inner.lock().unwrap().page_requests
    }

    fn page(&self, start_at: u64, max_results: u64) -> EtlResult<SearchPage> {
        let mut inner = self.inner.lock().unwrap();
        inner.page_requests += 1;

        let total = inner.records.len() as u64;
        let issues = inner
            .records
            .iter()
            .skip(start_at as usize)
            .take(max_results as usize)
            .cloned()
            .collect();

        Ok(SearchPage {
            start_at,
            max_results,
            total,
            issues,
        })
    }
}

impl Source for PagedMemorySource {
    async fn fetch_since(
        &self,
        project: &str,
        watermark: Option<DateTime<Utc>>,
    ) -> EtlResult<Vec<RawRecord>> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.requests.push((project.to_string(), watermark));
            if inner.fail {
                return Err(etl_error!(
                    ErrorKind::SourceQueryFailed,
                    "Searching issues failed",
                    "status 500"
                ));
            }
        }

        collect_pages(self.page_size, |cursor| {
            let page = self.page(cursor.start_at, cursor.page_size);
            async move { page }
        })
        .await
    }
}
