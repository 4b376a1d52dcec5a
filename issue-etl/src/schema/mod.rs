//! Target schema model and the sources it is loaded from.

mod field;
mod source;

pub use field::*;
pub use source::*;
