//! Configuration for the issue ETL.
//!
//! Provides environment detection, layered YAML and environment variable loading, a serializable
//! secret wrapper and the configuration types shared by the runner and the pipeline.

mod environment;
mod load;
mod secret;
pub mod shared;

pub use environment::*;
pub use load::*;
pub use secret::*;
