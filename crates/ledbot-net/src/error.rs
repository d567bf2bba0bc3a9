//! Error types for the networking module.

/// Network-specific errors.
///
/// Every failure on the socket, handshake, framing, JSON and remote-API
/// paths maps to exactly one of these kinds.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// DNS, TCP, TLS or socket I/O failure, or an unusable URL.
    #[error("Connection error: {0}")]
    Connection(String),
    /// The server answered the upgrade request with something other than 101.
    #[error("WebSocket handshake failed with HTTP {status}")]
    Handshake {
        /// The HTTP status code of the upgrade response.
        status: u16,
    },
    /// Unsupported frame length or malformed header/status line.
    #[error("Protocol error: {0}")]
    Protocol(String),
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Parse(#[from] serde_json::Error),
    /// A remote API call reported failure.
    #[error("API error: {0}")]
    Api(String),
}

impl NetworkError {
    /// Whether the error means the underlying socket is no longer usable.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Handshake { .. })
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Api(format!("undecodable response body: {err}"))
        } else if let Some(status) = err.status() {
            Self::Api(format!("HTTP {}", status.as_u16()))
        } else {
            Self::Connection(err.to_string())
        }
    }
}

impl From<url::ParseError> for NetworkError {
    fn from(err: url::ParseError) -> Self {
        Self::Connection(format!("invalid URL: {err}"))
    }
}

impl From<std::io::Error> for NetworkError {
    fn from(err: std::io::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

/// A specialized Result type for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_display_carries_status() {
        let err = NetworkError::Handshake { status: 404 };
        assert_eq!(err.to_string(), "WebSocket handshake failed with HTTP 404");
        assert!(err.is_connection());
    }

    #[test]
    fn test_io_error_maps_to_connection() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = NetworkError::from(io);
        assert!(matches!(err, NetworkError::Connection(ref msg) if msg.contains("reset")));
    }

    #[test]
    fn test_json_error_maps_to_parse() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = NetworkError::from(json_err);
        assert!(matches!(err, NetworkError::Parse(_)));
        assert!(!err.is_connection());
    }
}
