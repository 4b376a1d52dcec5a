//! Schema-driven flattening of nested source records.

mod extractor;
pub mod path;

pub use extractor::{extract, extract_many};
