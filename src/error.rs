//! Error types for the Pegasus library.
//!
//! All failures are represented by the [`PegasusError`] enum. Validation
//! errors carry the path of the offending fragment inside the filter tree
//! (for example `where.$and[1].age`) so callers can pinpoint it without
//! re-parsing the input.
//!
//! # Examples
//!
//! ```
//! use pegasus::error::{PegasusError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(PegasusError::invalid_argument("unknown fusion mode: middle"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {} ({})", e, e.kind()),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Pegasus operations.
#[derive(Error, Debug)]
pub enum PegasusError {
    /// Malformed expression or value shape.
    #[error("Schema error at {path}: {message}")]
    Schema { path: String, message: String },

    /// Operator not part of the grammar at this position.
    #[error("Unknown operator {operator:?} at {path}: expected one of {expected}")]
    UnknownOperator {
        path: String,
        operator: String,
        expected: String,
    },

    /// Operand type not accepted by its operator.
    #[error("Type mismatch at {path}: operator {operator} does not accept operand {operand}")]
    TypeMismatch {
        path: String,
        operator: String,
        operand: String,
    },

    /// Include set requests a field that is not allowed.
    #[error("Invalid include: {0}")]
    InvalidInclude(String),

    /// IDs appearing more than once, each listed once.
    #[error("Expected IDs to be unique, found duplicates for: {}", .0.join(", "))]
    DuplicateId(Vec<String>),

    /// Vector size mismatch or degenerate vector.
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),

    /// Empty candidate set for a requested modality.
    #[error("No datapoints: {0}")]
    NoDatapoints(String),

    /// Unrecognized modality, fusion mode or malformed request argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure reported by the embedding model collaborator.
    #[error("Embedding model error: {0}")]
    Model(#[source] anyhow::Error),

    /// Worker pool construction failure.
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// I/O errors (config and snapshot files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for operations that may fail with PegasusError.
pub type Result<T> = std::result::Result<T, PegasusError>;

impl PegasusError {
    /// Create a new schema error.
    pub fn schema<P: Into<String>, S: Into<String>>(path: P, msg: S) -> Self {
        PegasusError::Schema {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a new unknown operator error.
    pub fn unknown_operator<P: Into<String>, O: Into<String>>(
        path: P,
        operator: O,
        expected: &[&str],
    ) -> Self {
        PegasusError::UnknownOperator {
            path: path.into(),
            operator: operator.into(),
            expected: expected.join(", "),
        }
    }

    /// Create a new type mismatch error.
    pub fn type_mismatch<P: Into<String>, O: Into<String>, V: Into<String>>(
        path: P,
        operator: O,
        operand: V,
    ) -> Self {
        PegasusError::TypeMismatch {
            path: path.into(),
            operator: operator.into(),
            operand: operand.into(),
        }
    }

    /// Create a new invalid include error.
    pub fn invalid_include<S: Into<String>>(msg: S) -> Self {
        PegasusError::InvalidInclude(msg.into())
    }

    /// Create a new invalid dimension error.
    pub fn invalid_dimension<S: Into<String>>(msg: S) -> Self {
        PegasusError::InvalidDimension(msg.into())
    }

    /// Create a new no datapoints error.
    pub fn no_datapoints<S: Into<String>>(msg: S) -> Self {
        PegasusError::NoDatapoints(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        PegasusError::InvalidArgument(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        PegasusError::Config(msg.into())
    }

    /// Wrap a failure reported by an embedding model.
    pub fn model<E: Into<anyhow::Error>>(err: E) -> Self {
        PegasusError::Model(err.into())
    }

    /// Stable kind name, suitable for transport-level error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            PegasusError::Schema { .. } => "SchemaError",
            PegasusError::UnknownOperator { .. } => "UnknownOperator",
            PegasusError::TypeMismatch { .. } => "TypeMismatch",
            PegasusError::InvalidInclude(_) => "InvalidInclude",
            PegasusError::DuplicateId(_) => "DuplicateID",
            PegasusError::InvalidDimension(_) => "InvalidDimension",
            PegasusError::NoDatapoints(_) => "NoDatapoints",
            PegasusError::InvalidArgument(_) => "InvalidArgument",
            PegasusError::Config(_) => "Config",
            PegasusError::Model(_) => "Model",
            PegasusError::ThreadPool(_) => "ThreadPool",
            PegasusError::Io(_) => "Io",
            PegasusError::Json(_) => "Json",
        }
    }

    /// HTTP-like status code for this error.
    pub fn code(&self) -> u16 {
        match self {
            PegasusError::Model(_) | PegasusError::ThreadPool(_) | PegasusError::Io(_) => 500,
            _ => 400,
        }
    }
}
