//! Table stores issue ETL runs can write to.
//!
//! Each store implements the [`issue_etl::destination::Destination`] trait and is enabled through
//! its own cargo feature.

#[cfg(feature = "bigquery")]
pub mod bigquery;
#[cfg(feature = "bigquery")]
mod metrics;
