//! Helpers shared by unit and integration tests.
//!
//! Available to other crates through the `test-utils` feature.

pub mod destination;
pub mod record;
pub mod source;
