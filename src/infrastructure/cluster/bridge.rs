/// Cluster Bridge - Couples one hub instance to the cluster bus
///
/// Outbound:
/// - `BookingRelay`: a booking accepted here is published as
///   `BusMessage::Dispatch` so every other instance runs its own pass
/// - `EventEmitter`: local connections are served by the `ConnectionHub`;
///   a target this instance does not hold is published as `BusMessage::Emit`
///
/// Envelopes carry the hub's session id as `origin`, so a restarted process
/// with a pinned instance id publishes fresh message ids.
///
/// Inbound (`start`):
/// - messages published by this instance are skipped
/// - redelivered messages are dropped by `message_id`
/// - `Dispatch` runs `DispatchEngine::dispatch` with `DispatchOrigin::Relayed`
/// - `Emit` is delivered only when the target is held here
///
/// A failing publish never fails the caller's dispatch. The bridge flips
/// health to `Degraded` on the first failure and back on the next success.

use crate::application::ports::{BookingRelay, EventEmitter};
use crate::application::services::{DispatchEngine, DispatchOrigin};
use crate::domain::entities::Booking;
use crate::infrastructure::cluster::bus::{BusEnvelope, BusMessage, ClusterBus};
use crate::infrastructure::observability::HealthChecker;
use crate::infrastructure::transport::ConnectionHub;
use crate::shared::error::{BusError, EmitError};
use crate::shared::metrics::METRICS;
use crate::shared::protocol::{ConnectionId, OutboundEvent};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Number of recent message ids remembered for duplicate suppression
pub const DEDUP_WINDOW: NonZeroUsize = match NonZeroUsize::new(4096) {
    Some(n) => n,
    None => panic!("dedup window must be non-zero"),
};

pub struct ClusterBridge {
    origin: Arc<str>,
    hub: Arc<ConnectionHub>,
    bus: Arc<dyn ClusterBus>,
    health: Arc<HealthChecker>,
    next_seq: AtomicU64,
    seen: Mutex<LruCache<String, ()>>,
}

impl ClusterBridge {
    /// The bridge publishes under the hub's session id
    pub fn new(hub: Arc<ConnectionHub>, bus: Arc<dyn ClusterBus>, health: Arc<HealthChecker>) -> Self {
        Self {
            origin: Arc::from(hub.session_id()),
            hub,
            bus,
            health,
            next_seq: AtomicU64::new(1),
            seen: Mutex::new(LruCache::new(DEDUP_WINDOW)),
        }
    }

    pub fn instance_id(&self) -> &str {
        self.hub.instance_id()
    }

    /// `origin` stamped on every published envelope
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn hub(&self) -> &Arc<ConnectionHub> {
        &self.hub
    }

    pub fn bus_available(&self) -> bool {
        self.bus.is_available()
    }

    fn publish(&self, message: BusMessage) -> Result<(), BusError> {
        let kind = message.kind();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let envelope = BusEnvelope {
            message_id: format!("{}-{}", self.origin, seq),
            origin: self.origin.to_string(),
            message,
        };

        match self.bus.publish(envelope) {
            Ok(()) => {
                METRICS.bus_messages_total.with_label_values(&["out", kind]).inc();
                if self.health.recover() {
                    info!("cluster bus recovered, relaying to other instances again");
                }
                Ok(())
            }
            Err(e) => {
                METRICS.bus_errors_total.with_label_values(&[e.kind()]).inc();
                if self.health.degrade() {
                    warn!(error = %e, "cluster bus unavailable, dispatching to local drivers only");
                } else {
                    debug!(error = %e, kind, "bus publish failed");
                }
                Err(e)
            }
        }
    }

    /// Subscribes to the bus and spawns the inbound loop.
    ///
    /// The subscription is taken before this returns, so nothing published
    /// afterwards is missed.
    pub fn start<E: EventEmitter + 'static>(
        self: &Arc<Self>,
        engine: Arc<DispatchEngine<E>>,
    ) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let bridge = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(envelope) => {
                        bridge.handle_envelope(&engine, envelope);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        METRICS.bus_errors_total.with_label_values(&["lagged"]).inc();
                        warn!(skipped, "bus subscriber lagging, messages dropped");
                    }
                    Err(RecvError::Closed) => {
                        info!("cluster bus closed, stopping bridge");
                        break;
                    }
                }
            }
        })
    }

    /// Applies one inbound message; returns false when it was skipped
    pub fn handle_envelope<E: EventEmitter>(
        &self,
        engine: &DispatchEngine<E>,
        envelope: BusEnvelope,
    ) -> bool {
        if envelope.origin == *self.origin {
            return false;
        }
        if self.seen.lock().put(envelope.message_id.clone(), ()).is_some() {
            debug!(message_id = %envelope.message_id, "duplicate bus message dropped");
            return false;
        }

        METRICS
            .bus_messages_total
            .with_label_values(&["in", envelope.message.kind()])
            .inc();

        match envelope.message {
            BusMessage::Dispatch { booking } => {
                let matched = engine.dispatch(&booking, DispatchOrigin::Relayed);
                debug!(origin = %envelope.origin, matched, "relayed booking dispatched");
            }
            BusMessage::Emit { target, envelope: event } => {
                if !self.hub.holds(&target) {
                    return true;
                }
                let delivered = OutboundEvent::new(event)
                    .map_err(|e| e.to_string())
                    .and_then(|event| self.hub.emit(&target, &event).map_err(|e| e.to_string()));
                if let Err(e) = delivered {
                    METRICS.emit_failures_total.with_label_values(&["relayed_emit"]).inc();
                    debug!(%target, error = %e, "relayed emit not delivered");
                }
            }
        }
        true
    }
}

impl BookingRelay for ClusterBridge {
    fn relay_booking(&self, booking: &Booking) -> Result<(), BusError> {
        self.publish(BusMessage::Dispatch {
            booking: booking.clone(),
        })
    }
}

impl EventEmitter for ClusterBridge {
    fn emit(&self, target: &ConnectionId, event: &OutboundEvent) -> Result<(), EmitError> {
        match self.hub.emit(target, event) {
            Err(EmitError::UnknownConnection(_)) => self
                .publish(BusMessage::Emit {
                    target: target.clone(),
                    envelope: event.envelope().clone(),
                })
                .map_err(|_| EmitError::UnknownConnection(target.clone())),
            other => other,
        }
    }
}
