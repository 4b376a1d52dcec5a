mod base;
mod destination;
mod pipeline;
mod runner;
mod schema;
mod sentry;
mod source;

pub use base::*;
pub use destination::*;
pub use pipeline::*;
pub use runner::*;
pub use schema::*;
pub use sentry::*;
pub use source::*;
