use std::error;
use std::fmt;

/// Convenient result type for ETL operations using [`EtlError`] as the error type.
///
/// Every fallible operation of the pipeline, the sources and the destinations returns this type.
pub type EtlResult<T> = Result<T, EtlError>;

/// Main error type for ETL operations.
///
/// [`EtlError`] can represent a single error, an error with additional detail, or multiple
/// aggregated errors (for example one per rejected row of a batch insert).
#[derive(Debug, Clone)]
pub struct EtlError {
    repr: ErrorRepr,
}

/// Internal representation of error data.
#[derive(Debug, Clone)]
enum ErrorRepr {
    /// Error with kind and static description
    WithDescription(ErrorKind, &'static str),
    /// Error with kind, static description, and dynamic detail
    WithDescriptionAndDetail(ErrorKind, &'static str, String),
    /// Multiple aggregated errors
    Many(Vec<EtlError>),
}

/// Specific categories of errors that can occur during a run.
///
/// Kinds are grouped by the stage that produces them so that the pipeline and the runner can
/// decide how to report a failure without inspecting error messages.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    // Connection Errors
    SourceConnectionFailed,
    DestinationConnectionFailed,

    // Query & Execution Errors
    SourceQueryFailed,
    DestinationQueryFailed,
    PaginationStalled,
    TimezoneResolutionFailed,

    // Schema & Extraction Errors
    InvalidSchema,
    MissingRecordKey,
    PathNotFound,

    // Data & Transformation Errors
    ConversionError,
    InvalidData,

    // Configuration Errors
    ConfigError,

    // IO & Serialization Errors
    IoError,
    SerializationError,
    DeserializationError,

    // Security & Authentication Errors
    AuthenticationError,
    PermissionDenied,

    // State & Workflow Errors
    InvalidState,

    // General Errors
    SourceError,
    DestinationError,

    // Unknown / Uncategorized
    Unknown,
}

impl EtlError {
    /// Creates an [`EtlError`] containing multiple aggregated errors.
    pub fn many(errors: Vec<EtlError>) -> EtlError {
        EtlError {
            repr: ErrorRepr::Many(errors),
        }
    }

    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For multiple errors, returns the kind of the first error or [`ErrorKind::Unknown`]
    /// if the error list is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => kind,
            ErrorRepr::Many(ref errors) => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => vec![kind],
            ErrorRepr::Many(ref errors) => errors
                .iter()
                .flat_map(|err| err.kinds())
                .collect::<Vec<_>>(),
        }
    }

    /// Returns the detailed error information if available.
    ///
    /// For multiple errors, returns the detail of the first error that has one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::WithDescriptionAndDetail(_, _, ref detail) => Some(detail.as_str()),
            ErrorRepr::Many(ref errors) => errors.iter().find_map(|e| e.detail()),
            _ => None,
        }
    }

    /// Returns the aggregated errors, or a single-element slice for a simple error.
    pub fn errors(&self) -> &[EtlError] {
        match self.repr {
            ErrorRepr::Many(ref errors) => errors.as_slice(),
            _ => std::slice::from_ref(self),
        }
    }
}

impl PartialEq for EtlError {
    fn eq(&self, other: &EtlError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::WithDescription(kind_a, _), ErrorRepr::WithDescription(kind_b, _)) => {
                kind_a == kind_b
            }
            (
                ErrorRepr::WithDescriptionAndDetail(kind_a, _, _),
                ErrorRepr::WithDescriptionAndDetail(kind_b, _, _),
            ) => kind_a == kind_b,
            (ErrorRepr::Many(errors_a), ErrorRepr::Many(errors_b)) => {
                errors_a.len() == errors_b.len()
                    && errors_a.iter().zip(errors_b.iter()).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl fmt::Display for EtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self.repr {
            ErrorRepr::WithDescription(kind, desc) => {
                fmt::Debug::fmt(&kind, f)?;
                f.write_str(": ")?;
                desc.fmt(f)?;

                Ok(())
            }
            ErrorRepr::WithDescriptionAndDetail(kind, desc, ref detail) => {
                fmt::Debug::fmt(&kind, f)?;
                f.write_str(": ")?;
                desc.fmt(f)?;
                f.write_str(" -> ")?;
                detail.fmt(f)?;

                Ok(())
            }
            ErrorRepr::Many(ref errors) => {
                if errors.is_empty() {
                    write!(f, "Multiple errors occurred (empty)")?;
                } else if errors.len() == 1 {
                    errors[0].fmt(f)?;
                } else {
                    write!(f, "Multiple errors occurred ({} total):", errors.len())?;
                    for (i, error) in errors.iter().enumerate() {
                        write!(f, "\n  {}: {}", i + 1, error)?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl error::Error for EtlError {}

/// Creates an [`EtlError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for EtlError {
    fn from((kind, desc): (ErrorKind, &'static str)) -> EtlError {
        EtlError {
            repr: ErrorRepr::WithDescription(kind, desc),
        }
    }
}

/// Creates an [`EtlError`] from an error kind, static description, and dynamic detail.
impl From<(ErrorKind, &'static str, String)> for EtlError {
    fn from((kind, desc, detail): (ErrorKind, &'static str, String)) -> EtlError {
        EtlError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, desc, detail),
        }
    }
}

/// Creates an [`EtlError`] from a vector of errors for aggregation.
impl<E> From<Vec<E>> for EtlError
where
    E: Into<EtlError>,
{
    fn from(errors: Vec<E>) -> EtlError {
        EtlError {
            repr: ErrorRepr::Many(errors.into_iter().map(Into::into).collect()),
        }
    }
}

/// Converts [`std::io::Error`] to [`EtlError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> EtlError {
        EtlError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::IoError,
                "I/O error occurred",
                err.to_string(),
            ),
        }
    }
}

/// Converts [`serde_json::Error`] to [`EtlError`] with appropriate error kind.
impl From<serde_json::Error> for EtlError {
    fn from(err: serde_json::Error) -> EtlError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        EtlError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, description, err.to_string()),
        }
    }
}

/// Converts [`url::ParseError`] to [`EtlError`] with [`ErrorKind::ConfigError`].
impl From<url::ParseError> for EtlError {
    fn from(err: url::ParseError) -> EtlError {
        EtlError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::ConfigError,
                "URL parsing failed",
                err.to_string(),
            ),
        }
    }
}

/// Converts [`reqwest::Error`] to [`EtlError`] with appropriate error kind.
///
/// Transport failures map to [`ErrorKind::SourceConnectionFailed`], undecodable bodies to
/// [`ErrorKind::DeserializationError`] and unexpected statuses to [`ErrorKind::SourceQueryFailed`].
impl From<reqwest::Error> for EtlError {
    fn from(err: reqwest::Error) -> EtlError {
        let (kind, description) = if err.is_decode() {
            (
                ErrorKind::DeserializationError,
                "Source response could not be decoded",
            )
        } else if err.is_status() {
            match err.status().map(|status| status.as_u16()) {
                Some(401) => (
                    ErrorKind::AuthenticationError,
                    "Source rejected the credentials",
                ),
                Some(403) => (ErrorKind::PermissionDenied, "Source denied access"),
                _ => (ErrorKind::SourceQueryFailed, "Source request failed"),
            }
        } else if err.is_timeout() || err.is_connect() || err.is_request() {
            (
                ErrorKind::SourceConnectionFailed,
                "Source connection failed",
            )
        } else {
            (ErrorKind::SourceError, "Source HTTP client error")
        };

        EtlError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, description, err.to_string()),
        }
    }
}

/// Converts [`object_store::Error`] to [`EtlError`].
impl From<object_store::Error> for EtlError {
    fn from(err: object_store::Error) -> EtlError {
        let (kind, description) = match &err {
            object_store::Error::NotFound { .. } => {
                (ErrorKind::ConfigError, "Object not found in object store")
            }
            object_store::Error::PermissionDenied { .. }
            | object_store::Error::Unauthenticated { .. } => (
                ErrorKind::PermissionDenied,
                "Object store denied access",
            ),
            _ => (ErrorKind::IoError, "Object store operation failed"),
        };

        EtlError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, description, err.to_string()),
        }
    }
}
