/// Ports - Seams between the application layer and infrastructure
///
/// The dispatch engine only knows how to hand an event to "something that can
/// reach connection X" and how to ask "someone" to run the same booking on
/// other instances. Infrastructure provides both (`ConnectionHub`,
/// `ClusterBridge`); tests provide recording fakes.

use crate::domain::entities::Booking;
use crate::shared::error::{BusError, EmitError};
use crate::shared::protocol::{ConnectionId, OutboundEvent};
use std::sync::Arc;

/// Delivers an event to one connection, wherever it is held.
///
/// Implementations must not block: dispatch calls `emit` once per matched
/// driver inside a single synchronous pass.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, target: &ConnectionId, event: &OutboundEvent) -> Result<(), EmitError>;
}

impl<T: EventEmitter + ?Sized> EventEmitter for Arc<T> {
    fn emit(&self, target: &ConnectionId, event: &OutboundEvent) -> Result<(), EmitError> {
        (**self).emit(target, event)
    }
}

/// Publishes a booking so that every other instance dispatches it against
/// its own registry
pub trait BookingRelay: Send + Sync {
    fn relay_booking(&self, booking: &Booking) -> Result<(), BusError>;
}

impl<T: BookingRelay + ?Sized> BookingRelay for Arc<T> {
    fn relay_booking(&self, booking: &Booking) -> Result<(), BusError> {
        (**self).relay_booking(booking)
    }
}

/// Relay for single-instance deployments
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRelay;

impl BookingRelay for NoRelay {
    fn relay_booking(&self, _booking: &Booking) -> Result<(), BusError> {
        Ok(())
    }
}
