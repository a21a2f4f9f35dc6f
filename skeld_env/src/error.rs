//! Error types for the Skeld environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Network write failed (socket error, channel closed, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The remote peer closed the link or it was severed
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Frame encoding/decoding failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Context operation failed
    #[error("Context error: {0}")]
    ContextError(String),

    /// Operation timed out
    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl EnvError {
    /// Creates a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkError(msg.into())
    }

    /// Creates a connection-closed error.
    pub fn closed(msg: impl Into<String>) -> Self {
        Self::ConnectionClosed(msg.into())
    }
}

impl From<std::io::Error> for EnvError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::UnexpectedEof => Self::ConnectionClosed(err.to_string()),
            _ => Self::NetworkError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mapping() {
        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(matches!(EnvError::from(reset), EnvError::ConnectionClosed(_)));

        let other = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert!(matches!(EnvError::from(other), EnvError::NetworkError(_)));
    }
}
