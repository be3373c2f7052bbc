//! Error types for localgraph operations.
//!
//! All fallible operations return [`Result<T>`]. Messages are safe to hand to a
//! client: they name the failing entity or construct, never internal state.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for localgraph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Every failure the store, query engine, sessions and populator report.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Directory or document access failed, or a persisted document is corrupt.
    #[error("I/O error at {path:?}: {message}")]
    Io {
        /// Path of the file or directory involved
        path: PathBuf,
        /// Detailed error message
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage layer failure that is not tied to a path (e.g. a poisoned lock)
    #[error("Storage error: {message}")]
    Storage {
        /// Detailed error message
        message: String,
    },

    /// No node with this identity
    #[error("Node not found: {node_id}")]
    NodeNotFound {
        /// Identity that was looked up
        node_id: String,
    },

    /// Relationship not found in the graph
    #[error("Relationship not found: {relationship_id}")]
    RelationshipNotFound {
        /// ID of the missing relationship
        relationship_id: String,
    },

    /// Query text uses syntax the engine does not support
    #[error("Unsupported query syntax: {construct}")]
    QuerySyntax {
        /// The offending construct or a description of the parse failure
        construct: String,
    },

    /// A syntax tree node had an unexpected shape
    #[error("Malformed syntax tree in {path}: {reason}")]
    MalformedTree {
        /// File the tree was produced from
        path: String,
        /// What was wrong with the node
        reason: String,
    },

    /// Invalid operation (e.g., empty label)
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Description of what went wrong
        message: String,
    },

    /// A document or report could not be encoded
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error details
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Result column not present in a record
    #[error("Column '{column}' not found in record")]
    ColumnNotFound {
        /// Requested column name
        column: String,
    },

    /// Type mismatch when coercing a value
    #[error("Property type mismatch: expected {expected}, got {actual} for key '{key}'")]
    PropertyTypeMismatch {
        /// Property key or column name
        key: String,
        /// Expected type
        expected: String,
        /// Actual type found
        actual: String,
    },

    /// The selected graph backend cannot hand out sessions
    #[error("Graph backend unavailable: {message}")]
    BackendUnavailable {
        /// Why no session could be created
        message: String,
    },
}

impl GraphError {
    /// Create an I/O error for a path from a message and optional source.
    pub fn io<E>(path: impl Into<PathBuf>, message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Io {
            path: path.into(),
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Create a serialization error from a message and optional source.
    pub fn serialization<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Serialization {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Create a query syntax error naming the unsupported construct.
    pub fn query_syntax(construct: impl Into<String>) -> Self {
        Self::QuerySyntax {
            construct: construct.into(),
        }
    }

    /// Whether this error came from durable storage rather than graph logic.
    ///
    /// The analysis pipeline uses this to tell "not saved" apart from "not built".
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            GraphError::Io { .. } | GraphError::Storage { .. } | GraphError::Serialization { .. }
        )
    }
}
