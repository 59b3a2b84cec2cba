/// Cluster bus contract
///
/// A publish/subscribe channel shared by every hub instance. Delivery is
/// at-least-once to all subscribers, including the publisher itself;
/// receivers filter their own messages by `origin` and drop duplicates by
/// `message_id`.

use crate::domain::entities::Booking;
use crate::shared::error::BusError;
use crate::shared::protocol::{ConnectionId, Envelope};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// Default capacity of broadcast buffers on the bus
pub const BUS_CAPACITY: usize = 1024;

/// Payload carried between instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BusMessage {
    /// Run a dispatch pass for this booking against the local registry
    Dispatch { booking: Booking },

    /// Deliver `envelope` to `target` if the receiving instance holds it
    Emit {
        target: ConnectionId,
        envelope: Envelope,
    },
}

impl BusMessage {
    /// Metric label
    pub fn kind(&self) -> &'static str {
        match self {
            BusMessage::Dispatch { .. } => "dispatch",
            BusMessage::Emit { .. } => "emit",
        }
    }
}

/// A bus message with its routing metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusEnvelope {
    /// Unique per message, stable across redeliveries
    pub message_id: String,
    /// Instance id of the publisher
    pub origin: String,
    pub message: BusMessage,
}

/// Publish/subscribe contract between hub instances
pub trait ClusterBus: Send + Sync {
    /// Hands a message to the bus without waiting for delivery
    fn publish(&self, envelope: BusEnvelope) -> Result<(), BusError>;

    /// Receiver of every message published after this call
    fn subscribe(&self) -> broadcast::Receiver<BusEnvelope>;

    fn is_available(&self) -> bool;
}

/// In-process bus.
///
/// Serves single-process deployments, and lets several hubs in one process
/// (tests, embedded setups) share a bus. It can be switched off to exercise
/// the degraded path.
pub struct InMemoryBus {
    tx: broadcast::Sender<BusEnvelope>,
    available: AtomicBool,
}

impl InMemoryBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new(BUS_CAPACITY)
    }
}

impl ClusterBus for InMemoryBus {
    fn publish(&self, envelope: BusEnvelope) -> Result<(), BusError> {
        if !self.is_available() {
            return Err(BusError::Unavailable("in-memory bus is switched off".to_string()));
        }
        // no subscribers is not an error
        let _ = self.tx.send(envelope);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<BusEnvelope> {
        self.tx.subscribe()
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dispatch_envelope(id: &str) -> BusEnvelope {
        BusEnvelope {
            message_id: id.to_string(),
            origin: "node-a".to_string(),
            message: BusMessage::Dispatch {
                booking: Booking::new(json!({ "vehicleType": "sedan" })),
            },
        }
    }

    #[test]
    fn test_wire_format() {
        let envelope = BusEnvelope {
            message_id: "node-a-1".to_string(),
            origin: "node-a".to_string(),
            message: BusMessage::Emit {
                target: ConnectionId::from("node-b-3"),
                envelope: Envelope::new("new-booking", json!({ "id": 1 })),
            },
        };

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({
                "message_id": "node-a-1",
                "origin": "node-a",
                "message": {
                    "kind": "emit",
                    "target": "node-b-3",
                    "envelope": { "event": "new-booking", "data": { "id": 1 } }
                }
            })
        );
        let decoded: BusEnvelope = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_in_memory_bus_fans_out() {
        let bus = InMemoryBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(dispatch_envelope("m-1")).unwrap();

        assert_eq!(a.try_recv().unwrap().message_id, "m-1");
        assert_eq!(b.try_recv().unwrap().message_id, "m-1");
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = InMemoryBus::default();
        assert!(bus.publish(dispatch_envelope("m-1")).is_ok());
    }

    #[test]
    fn test_switched_off_bus_rejects_publish() {
        let bus = InMemoryBus::default();
        let mut rx = bus.subscribe();
        bus.set_available(false);

        let err = bus.publish(dispatch_envelope("m-1")).unwrap_err();
        assert_eq!(err.kind(), "unavailable");
        assert!(rx.try_recv().is_err());

        bus.set_available(true);
        assert!(bus.is_available());
        bus.publish(dispatch_envelope("m-2")).unwrap();
        assert_eq!(rx.try_recv().unwrap().message_id, "m-2");
    }
}
