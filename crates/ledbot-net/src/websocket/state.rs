//! Connection state.

/// Current state of a WebSocket connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection has been established yet.
    #[default]
    Disconnected,
    /// Upgraded and ready to send/receive frames.
    Open,
    /// The peer closed or reset the socket, or the stream lost frame alignment.
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Open => write!(f, "Open"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}
