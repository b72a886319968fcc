//! Error types for the cvrf-review crate.
//!
//! This module provides a single error type [`AdvisoryError`] covering every
//! failure mode in the library. Only a handful of variants are produced by the
//! decoding core; the rest belong to the collaborators around it (sources,
//! store, configuration).

use std::io;

/// The main error type for all operations in this crate.
#[derive(Debug, thiserror::Error)]
pub enum AdvisoryError {
    /// The top-level document envelope (`cvrfdoc` or its `Vulnerability`) is
    /// missing or not an object.
    #[error("Malformed CVRF envelope: {reason}")]
    MalformedEnvelope {
        /// Which part of the envelope was rejected.
        reason: String,
    },

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to fetch data from an advisory source.
    #[error("Source '{source_name}' fetch failed: {message}")]
    SourceFetch {
        /// Name of the source that failed (e.g., "FortiGuard").
        source_name: String,
        /// Description of what went wrong.
        message: String,
    },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP request via middleware failed.
    #[error("HTTP middleware error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    /// I/O error (file operations, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// XML feed or document could not be read.
    #[error("XML error: {0}")]
    Xml(String),

    /// Configuration error (missing or invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A severity label outside critical/high/medium/low.
    #[error("Unknown severity '{0}' (expected critical, high, medium or low)")]
    InvalidSeverity(String),
}

/// A specialized Result type for advisory operations.
pub type Result<T> = std::result::Result<T, AdvisoryError>;

impl AdvisoryError {
    /// Create a new malformed envelope error.
    pub fn malformed_envelope(reason: impl Into<String>) -> Self {
        Self::MalformedEnvelope {
            reason: reason.into(),
        }
    }

    /// Create a new source fetch error.
    pub fn source_fetch(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceFetch {
            source_name: source.into(),
            message: message.into(),
        }
    }

    /// Create a new XML error.
    pub fn xml(message: impl Into<String>) -> Self {
        Self::Xml(message.into())
    }

    /// Create a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error only concerns the single document being decoded.
    ///
    /// Batch callers skip such documents and carry on; any other error aborts
    /// the batch.
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedEnvelope { .. } | Self::Serialization(_) | Self::Xml(_)
        )
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::HttpMiddleware(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_errors_are_not_retryable() {
        let err = AdvisoryError::malformed_envelope("missing cvrfdoc");
        assert!(err.is_document_error());
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "Malformed CVRF envelope: missing cvrfdoc"
        );
    }

    #[test]
    fn test_source_fetch_aborts_batch() {
        let err = AdvisoryError::source_fetch("FortiGuard", "HTTP 503");
        assert!(!err.is_document_error());
        assert_eq!(
            err.to_string(),
            "Source 'FortiGuard' fetch failed: HTTP 503"
        );
    }
}
