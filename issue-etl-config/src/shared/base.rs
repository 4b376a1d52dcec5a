use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A mandatory value is empty.
    #[error("`{0}` must be set")]
    MissingValue(&'static str),
    /// The source base url cannot be parsed.
    #[error("`source.url` is not a valid url: {0}")]
    InvalidSourceUrl(String),
    /// The source page size is zero.
    #[error("`source.page_size` cannot be zero")]
    PageSizeZero,
    /// The schema location uses a scheme other than `gs://` or `file://`.
    #[error("`schema.location` has an unsupported scheme: {0}")]
    UnsupportedSchemaLocation(String),
}
