//! Error types for datopy-core

use thiserror::Error;

use crate::models::FieldViolation;

/// Result type alias for datopy-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in datopy-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// Processor definition error
    #[error("invalid processor '{processor}': {message}")]
    InvalidProcessor {
        /// Name of the processor with the error
        processor: String,
        /// Description of the error
        message: String,
    },

    /// Transform execution error
    #[error("transform error in '{transform}': {message}")]
    TransformError {
        /// Name or type of the transform
        transform: String,
        /// Description of the error
        message: String,
    },

    /// Record source or sink error
    #[error("source '{source_name}' error: {message}")]
    SourceError {
        /// Path or name of the source
        source_name: String,
        /// Description of the error
        message: String,
    },

    /// The schema document itself could not be compiled
    #[error("invalid schema '{schema}': {message}")]
    SchemaError {
        /// Schema name
        schema: String,
        /// Compiler message
        message: String,
    },

    /// A record does not conform to a schema
    #[error("record rejected by schema '{schema}' at '{path}': {message}")]
    SchemaViolation {
        /// Schema name
        schema: String,
        /// JSON pointer to the most specific violating field
        path: String,
        /// Validator message
        message: String,
    },

    /// A processed record breaks one or more field constraints
    #[error("{} validation error(s) for {model}: {}", violations.len(), join_violations(violations))]
    ModelViolation {
        /// Model name
        model: String,
        /// Every violation found, in field order
        violations: Vec<FieldViolation>,
    },

    /// Nothing matched a lookup query
    #[error("no result found for {query}")]
    LookupFailed {
        /// Display form of the query
        query: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
