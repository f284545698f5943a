/*!
 * Error types for the prawko application.
 *
 * This module contains custom error types for the provider clients, the
 * enrichment pipeline and the application as a whole, using the thiserror
 * crate for ergonomic error definitions.
 */

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single entry of a provider's structured error payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Human readable message
    pub message: String,

    /// Provider error classification (e.g. `value_error`)
    pub error_type: String,
}

impl ErrorDetail {
    /// Create a new error detail
    pub fn new(message: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: error_type.into(),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Type: {})", self.message, self.error_type)
    }
}

fn join_details(details: &[ErrorDetail]) -> String {
    if details.is_empty() {
        return "no details".to_string();
    }
    details
        .iter()
        .map(ErrorDetail::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider returned an empty body to a login request
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Structured error payload returned by the provider
    #[error("API responded with error: {status_code} - {}", join_details(.details))]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Error entries from the payload
        details: Vec<ErrorDetail>,
    },

    /// No voice in the catalog matched the requested selector
    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),
}

impl ProviderError {
    /// Error entries carried by this error, if any
    pub fn details(&self) -> &[ErrorDetail] {
        match self {
            Self::Api { details, .. } => details,
            _ => &[],
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors raised while enriching a single slide
#[derive(Error, Debug)]
pub enum EnrichmentError {
    /// The slide lacks the field the artifact is computed from
    #[error("Slide {slide_id} has an empty {field}")]
    EmptySourceField {
        /// Slide identifier
        slide_id: i64,
        /// Name of the empty column
        field: &'static str,
    },

    /// The provider failed to compute the artifact
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The worker pool could not run the computation
    #[error("Worker error: {0}")]
    Worker(String),

    /// Writing the artifact failed
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the enrichment pipeline
    #[error("Enrichment error: {0}")]
    Enrichment(#[from] EnrichmentError),

    /// Error from the database layer
    #[error("Database error: {0}")]
    Database(String),

    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Database(error.to_string())
    }
}
