//! Error types for AtlasKV Store
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::collection::CollectionKind;

/// Result type alias using AtlasError
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Unified error type for AtlasKV Store operations
#[derive(Debug, Error)]
pub enum AtlasError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The path exists but does not hold a store this version can read
    #[error("Invalid store format: {0}")]
    Format(String),

    /// A persisted record could not be encoded or decoded
    #[error("Encoding error: {0}")]
    Encoding(String),

    // -------------------------------------------------------------------------
    // Collection Errors
    // -------------------------------------------------------------------------
    #[error("Collection '{name}' exists as {existing}, requested as {requested}")]
    KindMismatch {
        name: String,
        existing: CollectionKind,
        requested: CollectionKind,
    },

    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Store is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // JSON Boundary Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AtlasError {
    /// True for failures of the backing storage (I/O, format, record encoding)
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            AtlasError::Io(_) | AtlasError::Format(_) | AtlasError::Encoding(_)
        )
    }
}
