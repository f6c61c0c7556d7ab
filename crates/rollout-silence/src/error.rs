//! Error types for the rollout-silence crate.

use thiserror::Error;

/// Errors that can occur while talking to the silence registry.
#[derive(Debug, Error)]
pub enum SilenceError {
    /// The registry base URL could not be parsed.
    #[error("invalid registry URL: {reason}")]
    InvalidUrl {
        /// The reason the URL is invalid.
        reason: String,
    },

    /// The request to the registry could not be completed.
    #[error("registry request failed: {reason}")]
    Request {
        /// The reason the request failed.
        reason: String,
    },

    /// The registry answered with something other than the success status.
    #[error("registry returned status {status}")]
    UnexpectedStatus {
        /// The HTTP status code that was returned.
        status: u16,
    },

    /// The registry response body could not be decoded.
    #[error("failed to decode registry response: {reason}")]
    Decode {
        /// The reason decoding failed.
        reason: String,
    },
}

/// Result type for silence operations.
pub type Result<T> = std::result::Result<T, SilenceError>;
