use serde::Deserialize;
use std::future::Future;
use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::types::RawRecord;

/// Position of a paginated search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchCursor {
    pub start_at: u64,
    pub page_size: u64,
    /// Total reported by the last page, `None` before the first request.
    pub total_known: Option<u64>,
}

impl SearchCursor {
    pub fn new(page_size: u64) -> Self {
        Self {
            start_at: 0,
            page_size,
            total_known: None,
        }
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub start_at: u64,
    pub max_results: u64,
    pub total: u64,
    #[serde(default)]
    pub issues: Vec<RawRecord>,
}

/// Requests pages through `fetch_page` until `total` records are accumulated.
///
/// The next page starts at the previous page's `startAt + maxResults` and requests as many
/// results as the server granted last time. A page that neither advances the cursor nor yields
/// records while records remain is reported as [`ErrorKind::PaginationStalled`].
pub async fn collect_pages<F, Fut>(page_size: u64, mut fetch_page: F) -> EtlResult<Vec<RawRecord>>
where
    F: FnMut(SearchCursor) -> Fut,
    Fut: Future<Output = EtlResult<SearchPage>>,
{
    let mut cursor = SearchCursor::new(page_size);
    let mut records = Vec::new();

    loop {
        debug!(
            current = records.len(),
            total = ?cursor.total_known,
            start_at = cursor.start_at,
            max_results = cursor.page_size,
            "reading page"
        );

        let page = fetch_page(cursor).await?;
        let received = page.issues.len();
        records.extend(page.issues);
        cursor.total_known = Some(page.total);

        if records.len() as u64 >= page.total {
            break;
        }

        // Both come from the server and may overflow.
        let next_start_at = page.start_at.checked_add(page.max_results);
        let next_start_at = match next_start_at {
            Some(next) if next > cursor.start_at && received > 0 => next,
            _ => bail!(
                ErrorKind::PaginationStalled,
                "Search pagination did not advance",
                format!(
                    "startAt {} returned {} of {} remaining records, next startAt would be {}",
                    cursor.start_at,
                    received,
                    page.total - records.len() as u64,
                    next_start_at.map_or_else(|| "out of range".to_string(), |n| n.to_string())
                )
            ),
        };

        cursor.start_at = next_start_at;
        if page.max_results > 0 {
            cursor.page_size = page.max_results;
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn page(
        start_at: u64,
        max_results: u64,
        total: u64,
        issues: Vec<RawRecord>,
    ) -> EtlResult<SearchPage> {
        Ok(SearchPage {
            start_at,
            max_results,
            total,
            issues,
        })
    }

    fn issues(from: u64, count: u64) -> Vec<RawRecord> {
        (from..from + count)
            .map(|i| json!({"key": format!("OPS-{i}")}).as_object().unwrap().clone())
            .collect()
    }

    #[tokio::test]
    async fn collects_exactly_total_records() {
        let requests = Mutex::new(Vec::new());

        let records = collect_pages(2, |cursor| {
            requests.lock().unwrap().push(cursor.start_at);
            let count = (5 - cursor.start_at).min(cursor.page_size);
            async move {
                page(
                    cursor.start_at,
                    cursor.page_size,
                    5,
                    issues(cursor.start_at, count),
                )
            }
        })
        .await
        .unwrap();

        assert_eq!(records.len(), 5);
        assert_eq!(records[4]["key"], json!("OPS-4"));
        assert_eq!(*requests.lock().unwrap(), vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn empty_result_needs_one_request() {
        let mut calls = 0;

        let records = collect_pages(500, |_| {
            calls += 1;
            async { page(0, 500, 0, vec![]) }
        })
        .await
        .unwrap();

        assert!(records.is_empty());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn follows_server_granted_page_size() {
        let requests = Mutex::new(Vec::new());

        let records = collect_pages(500, |cursor| {
            requests.lock().unwrap().push((cursor.start_at, cursor.page_size));
            async move {
                page(
                    cursor.start_at,
                    100,
                    150,
                    issues(cursor.start_at, (150 - cursor.start_at).min(100)),
                )
            }
        })
        .await
        .unwrap();

        assert_eq!(records.len(), 150);
        assert_eq!(*requests.lock().unwrap(), vec![(0, 500), (100, 100)]);
    }

    #[tokio::test]
    async fn stalled_cursor_fails() {
        let err = collect_pages(2, |_| async { page(0, 0, 5, issues(0, 2)) })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PaginationStalled);
    }

    #[tokio::test]
    async fn overflowing_cursor_fails() {
        let err = collect_pages(2, |_| async { page(u64::MAX, 2, 5, issues(0, 2)) })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PaginationStalled);
        assert!(err.detail().unwrap().ends_with("next startAt would be out of range"));
    }

    #[tokio::test]
    async fn empty_page_with_remaining_records_fails() {
        let err = collect_pages(2, |cursor| async move {
            let issues = if cursor.start_at == 0 {
                issues(0, 2)
            } else {
                vec![]
            };
            page(cursor.start_at, 2, 5, issues)
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PaginationStalled);
    }

    #[tokio::test]
    async fn page_errors_are_propagated() {
        let err = collect_pages(2, |_| async {
            Err::<SearchPage, _>(crate::etl_error!(
                ErrorKind::SourceQueryFailed,
                "Search request failed",
                "status 500"
            ))
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SourceQueryFailed);
    }

    #[test]
    fn decodes_search_response() {
        let page: SearchPage = serde_json::from_value(json!({
            "expand": "schema,names",
            "startAt": 0,
            "maxResults": 500,
            "total": 1,
            "issues": [{"key": "OPS-1", "fields": {}}]
        }))
        .unwrap();

        assert_eq!(page.max_results, 500);
        assert_eq!(page.issues.len(), 1);
    }
}
