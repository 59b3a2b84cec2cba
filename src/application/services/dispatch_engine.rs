/// Dispatch Engine - Proximity-based booking fan-out
///
/// This service matches a booking against the local presence registry and
/// emits it to every eligible driver. It also exposes the presence hooks the
/// transport layer calls when a driver reports or disconnects.
///
/// ## Dispatch pass
/// `RECEIVED → FILTERING → EMITTING → DONE`, once per booking:
/// 1. Extract the dispatch criteria (malformed booking → 0 matches)
/// 2. Take a registry snapshot
/// 3. Keep the drivers accepted by the `EligibilityFilter`
/// 4. Emit `new-booking` with the unmodified payload to each of them
///
/// No retries, no queueing, no acknowledgements. A failed emit to one
/// connection is logged and counted, and the pass carries on with the rest.
///
/// ## Dependency Injection
/// The engine is generic over `EventEmitter`, so the same engine runs
/// against a local `ConnectionHub`, a `ClusterBridge`, or a test recorder.
///
/// ## Usage
/// ```rust
/// use dispatch_hub::application::services::DispatchEngine;
/// use dispatch_hub::domain::{Booking, DriverRegistry, EligibilityFilter};
/// use dispatch_hub::infrastructure::transport::ConnectionHub;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let hub = Arc::new(ConnectionHub::new("node-a"));
/// let engine = DispatchEngine::new(
///     Arc::new(DriverRegistry::new()),
///     EligibilityFilter::new(),
///     hub.clone(),
/// );
///
/// let (connection_id, _rx) = hub.register();
/// engine
///     .on_presence_report(&connection_id, json!({
///         "driverId": "d-1",
///         "location": { "coordinates": [0.0, 0.0] },
///         "vehicleType": "sedan",
///         "status": "available"
///     }))
///     .unwrap();
///
/// let booking = Booking::new(json!({
///     "pickupLocation": { "coordinates": [0.0, 0.0] },
///     "vehicleType": "sedan"
/// }));
/// assert_eq!(engine.dispatch_booking(&booking), 1);
/// ```

use crate::application::ports::EventEmitter;
use crate::domain::entities::{Booking, DispatchCriteria, DriverPresence};
use crate::domain::eligibility::EligibilityFilter;
use crate::domain::registry::{DriverRegistry, Upsert};
use crate::shared::error::DispatchError;
use crate::shared::metrics::METRICS;
use crate::shared::protocol::{ConnectionId, Envelope, OutboundEvent, EVENT_NEW_BOOKING};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a dispatch pass was triggered, used as a metric label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOrigin {
    /// The booking arrived on this instance
    Local,
    /// The booking was relayed from another instance over the bus
    Relayed,
}

impl DispatchOrigin {
    fn label(self) -> &'static str {
        match self {
            DispatchOrigin::Local => "local",
            DispatchOrigin::Relayed => "relayed",
        }
    }
}

pub struct DispatchEngine<E: EventEmitter> {
    registry: Arc<DriverRegistry>,
    filter: EligibilityFilter,
    emitter: E,
}

impl<E: EventEmitter> DispatchEngine<E> {
    pub fn new(registry: Arc<DriverRegistry>, filter: EligibilityFilter, emitter: E) -> Self {
        Self {
            registry,
            filter,
            emitter,
        }
    }

    pub fn registry(&self) -> &Arc<DriverRegistry> {
        &self.registry
    }

    pub fn filter(&self) -> &EligibilityFilter {
        &self.filter
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    /// Drivers in the current snapshot that may receive `booking`
    pub fn matching_drivers(&self, booking: &Booking) -> Vec<Arc<DriverPresence>> {
        match booking.criteria() {
            Some(criteria) => self.matching_drivers_with(&criteria),
            None => Vec::new(),
        }
    }

    fn matching_drivers_with(&self, criteria: &DispatchCriteria<'_>) -> Vec<Arc<DriverPresence>> {
        self.registry
            .snapshot()
            .into_iter()
            .filter(|driver| self.filter.is_eligible(driver, criteria))
            .collect()
    }

    /// Dispatches a booking that arrived on this instance.
    ///
    /// Returns the number of matched drivers. Delivery is fire-and-forget.
    pub fn dispatch_booking(&self, booking: &Booking) -> usize {
        self.dispatch(booking, DispatchOrigin::Local)
    }

    /// Dispatches a booking and labels the pass with its origin
    pub fn dispatch(&self, booking: &Booking, origin: DispatchOrigin) -> usize {
        self.try_dispatch(booking, origin).unwrap_or(0)
    }

    /// Like `dispatch`, but `None` when the booking is malformed
    pub fn try_dispatch(&self, booking: &Booking, origin: DispatchOrigin) -> Option<usize> {
        let timer = METRICS
            .dispatch_duration
            .with_label_values(&[origin.label()])
            .start_timer();

        let Some(criteria) = booking.criteria() else {
            debug!(origin = origin.label(), "malformed booking, no drivers matched");
            METRICS.dispatches_total.with_label_values(&["malformed"]).inc();
            timer.observe_duration();
            return None;
        };

        let matched = self.matching_drivers_with(&criteria);
        if matched.is_empty() {
            debug!(origin = origin.label(), "no eligible drivers for booking");
            METRICS.dispatches_total.with_label_values(&["unmatched"]).inc();
            timer.observe_duration();
            return Some(0);
        }

        // 只编码一次，所有连接共享同一个帧
        let event = match OutboundEvent::new(Envelope::new(
            EVENT_NEW_BOOKING,
            booking.payload().clone(),
        )) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "failed to encode booking event");
                METRICS.dispatches_total.with_label_values(&["encode_error"]).inc();
                timer.observe_duration();
                return Some(0);
            }
        };

        for driver in &matched {
            match self.emitter.emit(&driver.connection_id, &event) {
                Ok(()) => {
                    debug!(connection_id = %driver.connection_id, "emitted booking to driver");
                }
                Err(e) => {
                    debug!(connection_id = %driver.connection_id, error = %e, "skipping driver");
                    METRICS.emit_failures_total.with_label_values(&[e.kind()]).inc();
                }
            }
        }

        METRICS.dispatches_total.with_label_values(&["matched"]).inc();
        METRICS
            .drivers_matched_total
            .with_label_values(&[origin.label()])
            .inc_by(matched.len() as f64);
        timer.observe_duration();

        info!(origin = origin.label(), matched = matched.len(), "booking dispatched");
        Some(matched.len())
    }

    /// Records a `driver-info` report for `connection_id`
    pub fn on_presence_report(
        &self,
        connection_id: &ConnectionId,
        data: Value,
    ) -> Result<(), DispatchError> {
        let presence = DriverPresence::from_report(connection_id.clone(), data);

        match self.registry.upsert(connection_id, presence) {
            Ok(Upsert::Inserted) => {
                METRICS.presence_events_total.with_label_values(&["insert"]).inc();
                METRICS.registered_drivers.set(self.registry.len() as i64);
                debug!(%connection_id, "driver registered");
                Ok(())
            }
            Ok(Upsert::Replaced) => {
                METRICS.presence_events_total.with_label_values(&["update"]).inc();
                debug!(%connection_id, "driver info updated");
                Ok(())
            }
            Err(e) => {
                METRICS.presence_events_total.with_label_values(&["rejected"]).inc();
                Err(e)
            }
        }
    }

    /// Drops the presence record of a closed connection
    pub fn on_disconnect(&self, connection_id: &ConnectionId) {
        if self.registry.remove(connection_id).is_some() {
            METRICS.presence_events_total.with_label_values(&["remove"]).inc();
            METRICS.registered_drivers.set(self.registry.len() as i64);
            debug!(%connection_id, "driver removed");
        }
    }
}
