//! Paginated retrieval of issue-tracker records.

pub mod filter;
mod jira;
pub mod pagination;

use chrono::{DateTime, Utc};
use std::future::Future;

use crate::error::EtlResult;
use crate::types::RawRecord;

pub use jira::JiraSource;

/// A remote collection of records that can be queried for changes since a point in time.
pub trait Source {
    /// Returns every record of `project` updated since `watermark`, oldest update first.
    ///
    /// `None` requests a full sync. The whole result is accumulated before returning.
    fn fetch_since(
        &self,
        project: &str,
        watermark: Option<DateTime<Utc>>,
    ) -> impl Future<Output = EtlResult<Vec<RawRecord>>> + Send;
}
