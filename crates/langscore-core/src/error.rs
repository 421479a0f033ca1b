//! Error types for langscore-core.
//!
//! This module defines the central error type [`CoreError`] used throughout
//! the data model, together with the [`CoreResult<T>`] alias.
//!
//! # Examples
//!
//! ```rust
//! use langscore_core::CoreError;
//!
//! let error = CoreError::ShapeMismatch {
//!     context: "pearsonr".to_string(),
//!     expected: vec![10, 4],
//!     actual: vec![9, 4],
//! };
//! assert!(error.to_string().contains("pearsonr"));
//! ```

use thiserror::Error;

/// Top-level error type for langscore-core operations.
///
/// # Error Categories
///
/// | Category | Variants |
/// |----------|----------|
/// | Configuration | ConfigError, UnknownName |
/// | Data integrity | ShapeMismatch, LengthMismatch, DuplicateSampleId, EmptyInput |
/// | Coordinates | CoordinateNotFound, AmbiguousCoordinate |
/// | Registry | DuplicateKey, NotRegistered |
/// | Infrastructure | IoError, SerializationError |
#[derive(Debug, Error)]
pub enum CoreError {
    // === Configuration Errors ===
    /// Configuration file invalid or a value out of range.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A named strategy (metric, aggregation, post-processing) is unknown.
    #[error("Unknown {kind} '{name}' (expected one of: {expected})")]
    UnknownName {
        /// What kind of name was looked up
        kind: &'static str,
        /// The offending value
        name: String,
        /// Comma-separated list of accepted names
        expected: String,
    },

    // === Data Integrity Errors ===
    /// Two arrays that must align do not have compatible shapes.
    #[error("Shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Operation that detected the mismatch
        context: String,
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        actual: Vec<usize>,
    },

    /// A parallel vector does not have one entry per index.
    #[error("Length mismatch for '{name}': expected {expected}, got {actual}")]
    LengthMismatch {
        /// Name of the vector or coordinate
        name: String,
        /// Required length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Sample identifiers must be unique within a dataset.
    #[error("Duplicate sample id '{0}'")]
    DuplicateSampleId(String),

    /// Operation requires at least one element.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    // === Coordinate Errors ===
    /// No dimension carries the requested coordinate.
    #[error("Coordinate '{0}' not found on any dimension")]
    CoordinateNotFound(String),

    /// The coordinate is attached to more than one dimension.
    #[error("Coordinate '{name}' spans several dimensions: {dims:?}")]
    AmbiguousCoordinate {
        /// Coordinate name
        name: String,
        /// Dimensions carrying it
        dims: Vec<String>,
    },

    // === Registry Errors ===
    /// A key was registered twice.
    #[error("Duplicate {registry} registration for key '{key}'")]
    DuplicateKey {
        /// Registry name (e.g. "dataset")
        registry: String,
        /// The key
        key: String,
    },

    /// Lookup of a key that was never registered.
    #[error("No {registry} registered under key '{key}'")]
    NotRegistered {
        /// Registry name
        registry: String,
        /// The key
        key: String,
    },

    // === Infrastructure Errors ===
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::ConfigError(err.to_string())
    }
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
