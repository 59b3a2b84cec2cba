//! Wire protocol shared by the driver transport, the HTTP ingestion endpoint
//! and the cluster bus.
//!
//! 所有消息都是 JSON 帧：`{"event": <name>, "data": <payload>}`

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Inbound presence report from a driver connection
pub const EVENT_DRIVER_INFO: &str = "driver-info";

/// Outbound booking offer addressed to one driver connection
pub const EVENT_NEW_BOOKING: &str = "new-booking";

/// Greeting sent to a driver right after the connection is accepted
pub const EVENT_CONNECTED: &str = "connected";

/// Opaque identifier of a live transport connection.
///
/// Hubs generate ids as `<instance-id>-<boot nonce>-<sequence>`, which keeps
/// them unique across every process attached to the same bus and across
/// restarts of one process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Arc<str>);

impl ConnectionId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(Arc::from(id))
    }
}

impl From<String> for ConnectionId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

/// Named event with a JSON payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// `connected` greeting carrying the id the hub assigned
    pub fn connected(connection_id: &ConnectionId) -> Self {
        Self::new(
            EVENT_CONNECTED,
            serde_json::json!({ "connectionId": connection_id.as_str() }),
        )
    }

    /// 编码为一个 JSON 帧
    pub fn encode(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }

    /// 从 JSON 帧解码
    pub fn decode(buf: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(buf)
    }
}

/// An envelope together with its pre-encoded frame.
///
/// Dispatch fans one event out to many connections; encoding once and
/// handing every connection a reference-counted `Bytes` keeps the per-target
/// cost at a pointer copy.
#[derive(Debug, Clone)]
pub struct OutboundEvent {
    envelope: Envelope,
    frame: Bytes,
}

impl OutboundEvent {
    pub fn new(envelope: Envelope) -> Result<Self, serde_json::Error> {
        let frame = envelope.encode()?;
        Ok(Self { envelope, frame })
    }

    pub fn name(&self) -> &str {
        &self.envelope.event
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn frame(&self) -> &Bytes {
        &self.frame
    }
}
