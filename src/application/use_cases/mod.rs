/// Use Cases - High-level business operations
///
/// Each use case represents a specific business operation that the
/// application can perform. Use cases orchestrate domain entities and
/// services to achieve application goals.
///
/// ## Available Use Cases
/// - `DispatchBookingUseCase`: Local dispatch plus cluster relay for a new booking

pub mod dispatch_booking;

// Re-export key types
pub use dispatch_booking::{DispatchBookingUseCase, DispatchOutcome};
