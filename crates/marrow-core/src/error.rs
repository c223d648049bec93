//! Unified error handling for Marrow
//!
//! This module provides a comprehensive error type that encompasses
//! all possible errors across the Marrow crates.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for all Marrow operations
#[derive(Error, Debug)]
pub enum Error {
    // ==================== I/O Errors ====================

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    // ==================== Provider Errors ====================

    /// A scene provider query failed and no fallback applies
    #[error("Provider query failed on node '{node}': {what}")]
    ProviderQuery {
        node: String,
        what: String,
    },

    // ==================== Structural Errors ====================

    /// The scene does not satisfy a structural precondition of the export
    #[error("Structural mismatch: {message}")]
    StructuralMismatch {
        message: String,
    },

    // ==================== Container Errors ====================

    /// Chunk tag did not match the expected tag at this position
    #[error("Unexpected chunk tag: expected {expected:?}, found {found:?}")]
    UnexpectedTag {
        expected: String,
        found: String,
    },

    /// Chunk header element size disagrees with the record layout
    #[error("Element size mismatch in chunk {tag:?}: expected {expected}, found {found}")]
    ElementSizeMismatch {
        tag: String,
        expected: u32,
        found: u32,
    },

    /// Chunk payload is truncated or malformed
    #[error("Corrupted chunk {tag:?} at offset {offset}: {message}")]
    CorruptedChunk {
        tag: String,
        offset: u64,
        message: String,
    },

    /// Unexpected end of file
    #[error("Unexpected end of file at offset {offset}")]
    UnexpectedEof {
        offset: u64,
    },

    // ==================== Consistency Errors ====================

    /// Recorded data disagrees with data recorded earlier in the session
    #[error("Consistency failure: {message}")]
    Consistency {
        message: String,
    },

    // ==================== Configuration Errors ====================

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        message: String,
    },

    /// Invalid frame range expression
    #[error("Invalid frame range '{input}': {message}")]
    InvalidFrameRange {
        input: String,
        message: String,
    },

    // ==================== General Errors ====================

    /// Internal error (should not happen)
    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },

    /// Custom error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

/// Result type using the unified Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Create a structural mismatch error
    pub fn structural(message: impl Into<String>) -> Self {
        Error::StructuralMismatch {
            message: message.into(),
        }
    }

    /// Create a consistency failure
    pub fn consistency(message: impl Into<String>) -> Self {
        Error::Consistency {
            message: message.into(),
        }
    }

    /// Create a provider query failure
    pub fn provider_query(node: impl Into<String>, what: impl Into<String>) -> Self {
        Error::ProviderQuery {
            node: node.into(),
            what: what.into(),
        }
    }

    /// Check if this is a container/format error
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Error::UnexpectedTag { .. }
                | Error::ElementSizeMismatch { .. }
                | Error::CorruptedChunk { .. }
                | Error::UnexpectedEof { .. }
        )
    }

    /// Check if this is a structural precondition error
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::StructuralMismatch { .. })
    }

    /// Check if this is a consistency failure
    pub fn is_consistency(&self) -> bool {
        matches!(self, Error::Consistency { .. })
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
