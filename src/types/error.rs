use thiserror::Error;

/// Boxed error raised by the external driver behind a [`Connection`](crate::adapter::Connection).
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by the mapper.
#[derive(Debug, Error)]
pub enum WidecolError {
    /// Caller contract violation: empty batch, malformed identifier set, unknown attribute.
    #[error("invalid argument: {0}")]
    Invalid(String),
    /// A value outside the declared attribute type's domain was handed to `encode`.
    #[error("{value} is not a valid {attribute_type}")]
    TypeMismatch {
        /// Name of the declared attribute type.
        attribute_type: &'static str,
        /// Debug rendering of the rejected value.
        value: String,
    },
    /// No data stored for the requested identifier(s).
    #[error("not found: {0}")]
    NotFound(String),
    /// Error surfaced by the underlying connection, unchanged.
    #[error("connection: {0}")]
    Connection(#[source] DriverError),
    /// Configuration could not be parsed or resolved.
    #[error("config: {0}")]
    Config(String),
    /// I/O error while reading configuration.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, WidecolError>;

impl WidecolError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        WidecolError::Invalid(message.into())
    }

    pub(crate) fn type_mismatch(attribute_type: &'static str, value: impl std::fmt::Debug) -> Self {
        WidecolError::TypeMismatch {
            attribute_type,
            value: format!("{value:?}"),
        }
    }

    /// Wraps a driver error so it propagates with its source intact.
    pub fn connection(err: impl Into<DriverError>) -> Self {
        WidecolError::Connection(err.into())
    }
}
