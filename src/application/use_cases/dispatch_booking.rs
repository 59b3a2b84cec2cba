/// Dispatch Booking Use Case
///
/// Entry point for a booking that arrived on this instance (HTTP `/emit`).
///
/// ## Responsibilities
/// - Run the local dispatch pass against this instance's registry
/// - Relay the booking so every other instance runs its own pass
/// - Always return a definite match count to the caller
///
/// The returned count covers the drivers matched on this instance. Drivers
/// held by other instances are matched there and show up in their logs and
/// `dispatch_hub_drivers_matched_total{origin="relayed"}`. A relay failure
/// degrades delivery to local-only; it is never reported as a failed booking.

use crate::application::ports::{BookingRelay, EventEmitter};
use crate::application::services::{DispatchEngine, DispatchOrigin};
use crate::domain::entities::Booking;
use std::sync::Arc;
use tracing::warn;

/// Result of dispatching one booking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Drivers matched on this instance
    pub matched: usize,

    /// Whether the booking was handed to the cluster bus
    pub relayed: bool,
}

pub struct DispatchBookingUseCase<E: EventEmitter, R: BookingRelay> {
    engine: Arc<DispatchEngine<E>>,
    relay: R,
}

impl<E: EventEmitter, R: BookingRelay> DispatchBookingUseCase<E, R> {
    pub fn new(engine: Arc<DispatchEngine<E>>, relay: R) -> Self {
        Self { engine, relay }
    }

    pub fn engine(&self) -> &Arc<DispatchEngine<E>> {
        &self.engine
    }

    /// Executes the use case
    pub fn execute(&self, booking: &Booking) -> DispatchOutcome {
        // malformed bookings match nothing anywhere, no point relaying them
        let Some(matched) = self.engine.try_dispatch(booking, DispatchOrigin::Local) else {
            return DispatchOutcome {
                matched: 0,
                relayed: false,
            };
        };

        let relayed = match self.relay.relay_booking(booking) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "booking not relayed, dispatched to local drivers only");
                false
            }
        };

        DispatchOutcome { matched, relayed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::NoRelay;
    use crate::domain::{DriverRegistry, EligibilityFilter};
    use crate::infrastructure::transport::ConnectionHub;
    use crate::shared::error::BusError;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingRelay {
        relayed: Mutex<Vec<Booking>>,
        fail: bool,
    }

    impl BookingRelay for RecordingRelay {
        fn relay_booking(&self, booking: &Booking) -> Result<(), BusError> {
            if self.fail {
                return Err(BusError::Unavailable("test".to_string()));
            }
            self.relayed.lock().push(booking.clone());
            Ok(())
        }
    }

    fn engine() -> (Arc<DispatchEngine<Arc<ConnectionHub>>>, Arc<ConnectionHub>) {
        let hub = Arc::new(ConnectionHub::new("test"));
        let engine = Arc::new(DispatchEngine::new(
            Arc::new(DriverRegistry::new()),
            EligibilityFilter::new(),
            hub.clone(),
        ));
        (engine, hub)
    }

    fn booking() -> Booking {
        Booking::new(json!({
            "pickupLocation": { "coordinates": [0.0, 0.0] },
            "vehicleType": "sedan"
        }))
    }

    #[test]
    fn test_execute_dispatches_and_relays() {
        let (engine, hub) = engine();
        let (id, mut rx) = hub.register();
        engine
            .on_presence_report(&id, json!({
                "location": { "coordinates": [0.0, 0.0] },
                "vehicleType": "sedan",
                "status": "available"
            }))
            .unwrap();

        let use_case = DispatchBookingUseCase::new(engine, RecordingRelay::default());
        let outcome = use_case.execute(&booking());

        assert_eq!(outcome, DispatchOutcome { matched: 1, relayed: true });
        assert_eq!(use_case.relay.relayed.lock().len(), 1);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_relay_failure_still_returns_count() {
        let (engine, _hub) = engine();
        let use_case = DispatchBookingUseCase::new(
            engine,
            RecordingRelay {
                fail: true,
                ..Default::default()
            },
        );

        let outcome = use_case.execute(&booking());
        assert_eq!(outcome, DispatchOutcome { matched: 0, relayed: false });
    }

    #[test]
    fn test_malformed_booking_is_not_relayed() {
        let (engine, _hub) = engine();
        let use_case = DispatchBookingUseCase::new(engine, RecordingRelay::default());

        let outcome = use_case.execute(&Booking::new(json!({ "vehicleType": "sedan" })));
        assert_eq!(outcome.matched, 0);
        assert!(!outcome.relayed);
        assert!(use_case.relay.relayed.lock().is_empty());
    }

    #[test]
    fn test_unmatched_booking_is_still_relayed() {
        let (engine, _hub) = engine();
        let use_case = DispatchBookingUseCase::new(engine, RecordingRelay::default());

        let outcome = use_case.execute(&booking());
        assert_eq!(outcome, DispatchOutcome { matched: 0, relayed: true });
        assert_eq!(use_case.relay.relayed.lock().len(), 1);
    }

    #[test]
    fn test_single_instance_relay() {
        let (engine, _hub) = engine();
        let use_case = DispatchBookingUseCase::new(engine, NoRelay);
        assert!(use_case.execute(&booking()).relayed);
    }
}
