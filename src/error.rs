//! Error types for the code2prompt MCP server

use std::path::PathBuf;
use thiserror::Error;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for gateway operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },

    /// Request did not complete in time
    #[error("Network timeout: {0}")]
    Timeout(String),

    /// Connection-level failure before any response
    #[error("Network error: {0}")]
    Network(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model name outside the supported set
    #[error("Unsupported model '{model}'. Supported models: {supported}")]
    UnsupportedModel {
        /// The rejected model name
        model: String,
        /// Comma-separated supported model names
        supported: String,
    },

    /// GEMINI_API_KEY absent or empty
    #[error(
        "GEMINI_API_KEY environment variable is required. \
         Set it in your environment or create a .env file with your API key."
    )]
    MissingCredential,

    /// code2prompt engine invocation failure
    #[error("Engine error: {0}")]
    Engine(String),

    /// Context generation failed while producing an artifact
    #[error("Failed to generate codebase context: {0}")]
    ContextGeneration(String),

    /// Context extraction failed inside the QA pipeline
    #[error("Context extraction failed: {0}")]
    Extraction(String),

    /// Context artifact disappeared between write and read
    #[error("Context file not found at {}", path.display())]
    ArtifactMissing {
        /// Expected artifact location
        path: PathBuf,
    },

    /// Context artifact exists but could not be read
    #[error("Failed to read context file {}: {source}", path.display())]
    ArtifactRead {
        /// Artifact location
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// No permission to write the context artifact
    #[error("Permission denied when writing to {}: {source}", path.display())]
    ArtifactPermission {
        /// Attempted artifact location
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// Storage exhausted while writing the context artifact
    #[error("Insufficient disk space to write context file to {}", path.display())]
    ArtifactOutOfSpace {
        /// Attempted artifact location
        path: PathBuf,
    },

    /// Context artifact write failed for another I/O reason
    #[error("Failed to write context file to {}: {source}", path.display())]
    ArtifactWrite {
        /// Attempted artifact location
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// Post-write bookkeeping failed in a way the ladder above does not cover
    #[error("Unexpected error writing context file to {}: {message}", path.display())]
    ArtifactUnexpected {
        /// Attempted artifact location
        path: PathBuf,
        /// Description of the failure
        message: String,
    },

    /// Fully formed user-facing message from failure classification
    #[error("{0}")]
    Service(String),
}
