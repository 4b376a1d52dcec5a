//! Macros for ETL error handling.
//!
//! Provides convenience macros for creating and returning [`crate::error::EtlError`] instances with
//! reduced boilerplate.

/// Creates an [`crate::error::EtlError`] from error kind and description.
///
/// An optional third argument is rendered with `to_string()` and attached as detail.
#[macro_export]
macro_rules! etl_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::EtlError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::EtlError::from(($kind, $desc, $detail.to_string()))
    };
}

/// Creates and returns an [`crate::error::EtlError`] from the current function.
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return Err($crate::etl_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return Err($crate::etl_error!($kind, $desc, $detail))
    };
}
