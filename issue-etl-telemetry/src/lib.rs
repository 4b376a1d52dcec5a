//! Logging and metrics setup for the issue ETL binaries and tests.

mod logging;
mod prometheus;

pub use logging::*;
pub use prometheus::*;
