//! Error types shared across layers
//!
//! Per-driver failures (unknown connection, closed socket) and bus outages
//! are logged and counted by their callers; only structurally invalid calls
//! such as an empty connection id are rejected at the boundary.

use crate::shared::protocol::ConnectionId;

/// Rejections raised by the presence and dispatch boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("connection id must not be empty")]
    InvalidConnectionId,
}

/// Failure to deliver an event to one connection
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    #[error("connection {0} is not held by this instance")]
    UnknownConnection(ConnectionId),

    #[error("connection {0} is closed")]
    ConnectionClosed(ConnectionId),
}

impl EmitError {
    /// Metric label for this failure
    pub fn kind(&self) -> &'static str {
        match self {
            EmitError::UnknownConnection(_) => "unknown_connection",
            EmitError::ConnectionClosed(_) => "connection_closed",
        }
    }
}

/// 集群总线错误
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("cluster bus unavailable: {0}")]
    Unavailable(String),

    #[error("failed to encode bus message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("bus I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BusError {
    /// Metric label for this failure
    pub fn kind(&self) -> &'static str {
        match self {
            BusError::Unavailable(_) => "unavailable",
            BusError::Encode(_) => "encode",
            BusError::Io(_) => "io",
        }
    }
}

/// Accept-loop failures of the driver server and the bus relay
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_error_kinds() {
        let id = ConnectionId::from("x-1");
        assert_eq!(EmitError::UnknownConnection(id.clone()).kind(), "unknown_connection");
        assert_eq!(EmitError::ConnectionClosed(id).kind(), "connection_closed");
    }

    #[test]
    fn test_bus_error_display() {
        let err = BusError::Unavailable("relay link down".to_string());
        assert_eq!(err.to_string(), "cluster bus unavailable: relay link down");
        assert_eq!(err.kind(), "unavailable");
    }
}
