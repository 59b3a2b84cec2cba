/// Domain Layer - Core Dispatch Logic
///
/// Pure presence and matching logic with no I/O. The domain layer is
/// framework-agnostic and can be tested in isolation.
///
/// ## Modules
/// - `geo`: Haversine distance and radius checks
/// - `entities`: Driver presence records and bookings
/// - `registry`: Concurrency-safe live presence store
/// - `eligibility`: Status, vehicle-type and proximity predicate
///
/// ## Principles
/// 1. **Pure Business Logic**: No I/O, no frameworks, no infrastructure
/// 2. **Lenient Input**: Malformed reports and bookings narrow matching, they never panic
/// 3. **Testable**: Easy to unit test without mocks

pub mod geo;
pub mod entities;
pub mod registry;
pub mod eligibility;

// Re-export key types
pub use entities::{Booking, DispatchCriteria, DriverPresence, DriverStatus};
pub use eligibility::{EligibilityFilter, MatchPolicy, VehicleTypeMatch, MATCH_RADIUS_KM};
pub use geo::{distance_km, within_radius, GeoPoint, EARTH_RADIUS_KM};
pub use registry::{DriverRegistry, Upsert};
