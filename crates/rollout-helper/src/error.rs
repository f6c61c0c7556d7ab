//! Error types for the helper process.

use std::net::SocketAddr;

use thiserror::Error;

/// Errors that can occur while assembling or running the helper.
#[derive(Debug, Error)]
pub enum HelperError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The Kubernetes client could not be constructed.
    #[error("kubernetes client error: {0}")]
    Kube(String),

    /// Binding the health listener failed.
    #[error("failed to bind health listener on {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    /// The health server failed while serving.
    #[error("health server error: {0}")]
    Health(String),
}

/// Result type for helper operations.
pub type Result<T> = std::result::Result<T, HelperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = HelperError::Config("alertmanager URL is required".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: alertmanager URL is required"
        );
    }

    #[test]
    fn test_kube_error_display() {
        let err = HelperError::Kube("invalid CA bundle".to_string());
        assert_eq!(err.to_string(), "kubernetes client error: invalid CA bundle");
    }

    #[test]
    fn test_bind_failed_error_display() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().expect("valid address");
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err = HelperError::BindFailed(addr, io);
        assert_eq!(
            err.to_string(),
            "failed to bind health listener on 127.0.0.1:8080: address in use"
        );
    }

    #[test]
    fn test_health_error_display() {
        let err = HelperError::Health("connection reset".to_string());
        assert_eq!(err.to_string(), "health server error: connection reset");
    }
}
