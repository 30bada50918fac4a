//! Error types for the glaurung65 analysis core.
//!
//! Bad input bytes never produce an error; the analyzers log them and
//! reclassify the offending bytes as data. The variants here cover invalid
//! caller-supplied structures and internal invariant violations.

use thiserror::Error;

/// Main error type for glaurung65 operations.
#[derive(Debug, Error)]
pub enum Glaurung65Error {
    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Address map does not describe the image
    #[error("Invalid address map: {0}")]
    InvalidAddressMap(String),

    /// Rejected format descriptor combination
    #[error("Invalid format descriptor: {0}")]
    InvalidDescriptor(String),

    /// Label already present in the symbol table
    #[error("Duplicate label: {0}")]
    DuplicateLabel(String),

    /// Unique label generation gave up
    #[error("Too many identical symbols for {0}")]
    LabelExhausted(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal invariant violated; indicates a CPU table or logic bug
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Glaurung65Error {
    fn from(err: serde_json::Error) -> Self {
        Glaurung65Error::Serialization(err.to_string())
    }
}

/// Result type alias for glaurung65 operations
pub type Result<T> = std::result::Result<T, Glaurung65Error>;
