//! Error types for cql-driver-rs.
//!
//! This module defines domain-specific error types organized by functional area.
//! Every driver operation returns [`DriverError`]; the narrower enums are
//! wrapped into it.

use std::fmt;
use thiserror::Error;

/// Top-level error returned by every driver contract operation.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The session could not be established or failed its health check.
    ///
    /// The root cause is only reported to the diagnostic log. Pooling callers
    /// should discard the connection when they see this.
    #[error("driver: bad connection")]
    BadConnection,

    /// The operation is not supported by the store (transactions, insert id,
    /// affected rows).
    #[error("not supported")]
    NotSupported,

    /// The statement has been closed or was never bound to a query.
    #[error("query is nil")]
    QueryIsNil,

    /// An argument carried a parameter name.
    #[error("named values not supported")]
    NamedValuesNotSupported,

    /// An argument ordinal was outside `1..=argument count`.
    #[error("ordinal out of range")]
    OrdinalOutOfRange,

    /// The configuration string could not be decoded.
    #[error("invalid config string: {0}")]
    Config(#[from] ConfigError),

    /// The cursor failed to hand out row data.
    #[error("row data error: {0}")]
    RowData(NativeError),

    /// A row value could not be converted.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Error reported by the native client.
    #[error(transparent)]
    Native(#[from] NativeError),

    /// No driver registered under the given name.
    #[error("unknown driver {0:?} (forgotten registration?)")]
    UnknownDriver(String),

    /// A driver is already registered under the given name.
    #[error("driver {0:?} is already registered")]
    DuplicateDriver(String),
}

/// Errors raised while decoding a configuration string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A `key=value` pair had no `=`.
    #[error("missing =")]
    MissingEquals,

    /// The key is not part of the configuration grammar.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The value failed the key's type-specific parse.
    #[error("failed for: {key} = {value}")]
    InvalidValue { key: String, value: String },
}

/// Errors raised when a [`Context`](crate::Context) ends an operation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// The context was cancelled explicitly.
    #[error("context canceled")]
    Canceled,

    /// The context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Errors reported by the native client.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NativeError {
    /// Creating a session failed
    #[error("session error: {0}")]
    Session(String),

    /// Statement preparation or execution failed
    #[error("{0}")]
    Execution(String),

    /// Fetching or decoding rows failed
    #[error("fetch error: {0}")]
    Fetch(String),

    /// The session has been closed
    #[error("session has been closed")]
    SessionClosed,

    /// The operation was ended by its context
    #[error(transparent)]
    Context(#[from] ContextError),

    /// The native client cannot honour a configuration option
    #[error("unsupported by native client: {0}")]
    Unsupported(String),
}

/// Errors related to value conversion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// A row cell was not a decode slot.
    #[error("source is not a pointer")]
    NotAPointer,

    /// The argument type has no generic representation.
    #[error("unsupported type {type_name}")]
    UnsupportedType { type_name: String },

    /// `u64` arguments above `i64::MAX` are rejected by the default converter.
    #[error("uint64 values with high bit set are not supported")]
    Uint64HighBit,

    /// The value does not fit the target representation.
    #[error("value out of range: {0}")]
    OutOfRange(String),
}

/// Classification of [`DriverError`] by how a caller should react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed configuration string
    Configuration,
    /// Session establishment or health check failure
    ConnectionHealth,
    /// Named argument or ordinal out of range
    ArgumentBinding,
    /// Operation on a released statement
    StatementLifecycle,
    /// Operation the store does not support
    Unsupported,
    /// Row value conversion failure
    RowConversion,
    /// Anything reported by the native client
    Native,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "CONFIGURATION"),
            ErrorKind::ConnectionHealth => write!(f, "CONNECTION_HEALTH"),
            ErrorKind::ArgumentBinding => write!(f, "ARGUMENT_BINDING"),
            ErrorKind::StatementLifecycle => write!(f, "STATEMENT_LIFECYCLE"),
            ErrorKind::Unsupported => write!(f, "UNSUPPORTED"),
            ErrorKind::RowConversion => write!(f, "ROW_CONVERSION"),
            ErrorKind::Native => write!(f, "NATIVE"),
        }
    }
}

impl DriverError {
    /// Map to the error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriverError::BadConnection => ErrorKind::ConnectionHealth,
            DriverError::NotSupported => ErrorKind::Unsupported,
            DriverError::QueryIsNil => ErrorKind::StatementLifecycle,
            DriverError::NamedValuesNotSupported | DriverError::OrdinalOutOfRange => {
                ErrorKind::ArgumentBinding
            }
            DriverError::Config(_)
            | DriverError::UnknownDriver(_)
            | DriverError::DuplicateDriver(_) => ErrorKind::Configuration,
            DriverError::Conversion(_) => ErrorKind::RowConversion,
            DriverError::RowData(_) | DriverError::Native(_) => ErrorKind::Native,
        }
    }

    /// Whether the connection should be discarded by a pool.
    pub fn is_bad_connection(&self) -> bool {
        matches!(self, DriverError::BadConnection)
    }
}
