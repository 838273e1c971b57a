//! Error types for the driver layer.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Every driver operation fails with a [`DriverError`]; nothing is retried inside
//! the crate, and the caller decides how each kind is presented to its clients.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Invalid input: {message}")]
    Validation { message: String },

    #[error("Query failed: {message}")]
    Query {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Could not parse {what}: {input}")]
    Parse { what: String, input: String },

    #[error("Unsupported database engine '{engine}' (expected \"postgres\" or \"mysql\")")]
    UnsupportedEngine { engine: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },
}

/// Coarse error category, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    Validation,
    Query,
    Parse,
    UnsupportedEngine,
    Timeout,
}

impl DriverError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a query error with optional SQL state.
    pub fn query(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Query {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a parse error for catalog text that could not be decomposed.
    pub fn parse(what: impl Into<String>, input: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            input: input.into(),
        }
    }

    /// Create an unsupported engine error.
    pub fn unsupported_engine(engine: impl Into<String>) -> Self {
        Self::UnsupportedEngine {
            engine: engine.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Wrap any failure that happened while establishing a connection.
    ///
    /// Authentication failures come back from sqlx as database errors, so the
    /// generic `From<sqlx::Error>` mapping would classify them as query errors.
    pub fn from_connect(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => DriverError::connection(
                db_err.message(),
                "Check the username, password and database name",
            ),
            sqlx::Error::Configuration(msg) => DriverError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            other => match DriverError::from(other) {
                DriverError::Connection {
                    message,
                    suggestion,
                } => DriverError::Connection {
                    message,
                    suggestion,
                },
                DriverError::Timeout { .. } => DriverError::connection(
                    "Connection attempt timed out",
                    "Check that the server is reachable",
                ),
                rest => DriverError::connection(
                    rest.to_string(),
                    "Check network connectivity and database server status",
                ),
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Query { .. } => ErrorKind::Query,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::UnsupportedEngine { .. } => ErrorKind::UnsupportedEngine,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Query { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Message suitable for untrusted clients.
    ///
    /// Connection errors carry the engine's own text (host names, user names),
    /// which stays in `Display` for operators but is replaced here.
    pub fn public_message(&self) -> String {
        match self {
            Self::Connection { .. } => "Could not connect to the database".to_string(),
            Self::Query {
                message, sql_state, ..
            } => match sql_state {
                Some(code) => format!("{} (SQLSTATE: {})", message, code),
                None => message.clone(),
            },
            other => other.to_string(),
        }
    }
}

/// Convert sqlx errors to DriverError.
impl From<sqlx::Error> for DriverError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DriverError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DriverError::query(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DriverError::query(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => DriverError::timeout("connection acquire", 0),
            sqlx::Error::PoolClosed => {
                DriverError::connection("Connection is closed", "Retry the operation")
            }
            sqlx::Error::Io(io_err) => DriverError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DriverError::connection(
                format!("TLS error: {}", tls_err),
                "Verify the ssl setting and the server's TLS configuration",
            ),
            sqlx::Error::Protocol(msg) => DriverError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::TypeNotFound { type_name } => DriverError::query(
                format!("Type not found: {}", type_name),
                None,
                "Check the referenced types",
            ),
            sqlx::Error::ColumnNotFound(col) => DriverError::query(
                format!("Column not found: {}", col),
                None,
                "Check the referenced columns",
            ),
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DriverError::query(
                format!("Column index {} out of bounds (len: {})", index, len),
                None,
                "Check the result shape",
            ),
            sqlx::Error::ColumnDecode { index, source } => DriverError::query(
                format!("Failed to decode column {}: {}", index, source),
                None,
                "Check the column types",
            ),
            sqlx::Error::Decode(source) => DriverError::query(
                format!("Decode error: {}", source),
                None,
                "Check the column types",
            ),
            _ => DriverError::query(
                format!("Unknown database error: {}", err),
                None,
                "Check the database server logs",
            ),
        }
    }
}

/// Result type alias for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;
