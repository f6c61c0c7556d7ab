//! Error types for the rollout-watch crate.

use thiserror::Error;

/// Errors that can occur while reading cluster state.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The request to the cluster API could not be completed.
    #[error("cluster request failed: {reason}")]
    Request {
        /// The reason the request failed.
        reason: String,
    },

    /// The cluster API answered with an unexpected HTTP status.
    #[error("cluster API returned status {status}")]
    UnexpectedStatus {
        /// The HTTP status code that was returned.
        status: u16,
    },

    /// The cluster API response body could not be decoded.
    #[error("failed to decode cluster response: {reason}")]
    Decode {
        /// The reason decoding failed.
        reason: String,
    },
}

/// Result type for cluster-view operations.
pub type Result<T> = std::result::Result<T, ClusterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_request() {
        let err = ClusterError::Request {
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "cluster request failed: connection refused");
    }

    #[test]
    fn error_display_unexpected_status() {
        let err = ClusterError::UnexpectedStatus { status: 503 };
        assert_eq!(err.to_string(), "cluster API returned status 503");
    }

    #[test]
    fn error_display_decode() {
        let err = ClusterError::Decode {
            reason: "missing field `items`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to decode cluster response: missing field `items`"
        );
    }
}
