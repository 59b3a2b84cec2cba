/// Application Layer - Use Cases and Services
///
/// This layer orchestrates domain logic to implement application-specific
/// business use cases. It depends on the domain layer but is independent
/// of infrastructure details (thanks to the traits in `ports`).
///
/// ## Modules
/// - `ports`: `EventEmitter` and `BookingRelay` seams
/// - `services`: `DispatchEngine`
/// - `use_cases`: `DispatchBookingUseCase`

pub mod ports;
pub mod services;
pub mod use_cases;

// Re-export key services
pub use ports::{BookingRelay, EventEmitter, NoRelay};
pub use services::{DispatchEngine, DispatchOrigin};
pub use use_cases::{DispatchBookingUseCase, DispatchOutcome};
