/// Shared utilities and types used across all layers
///
/// This module contains:
/// - Protocol definitions (event envelopes, connection ids)
/// - Error types
/// - Prometheus metrics

pub mod protocol;
pub mod error;
pub mod metrics;

// Re-export commonly used types
pub use protocol::{
    ConnectionId, Envelope, OutboundEvent,
    EVENT_CONNECTED, EVENT_DRIVER_INFO, EVENT_NEW_BOOKING,
};

pub use error::{BusError, DispatchError, EmitError, TransportError};
