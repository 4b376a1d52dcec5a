mod client;
mod core;
mod encoding;
mod encryption;

pub use client::{BigQueryDatasetId, BigQueryProjectId, BigQueryTableId};
pub use core::BigQueryDestination;
pub use encryption::install_crypto_provider_for_bigquery;
