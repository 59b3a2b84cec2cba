/// Infrastructure Layer - Technical Implementations
///
/// This layer contains everything that touches the outside world: driver
/// sockets, the cluster bus, and the observability endpoints.
///
/// The infrastructure layer depends on the domain and application layers;
/// neither depends on infrastructure. The dispatch engine sees it only
/// through the `EventEmitter` and `BookingRelay` ports.
///
/// ## Modules
/// - `transport`: TCP driver connections and the per-instance connection hub
/// - `cluster`: cross-instance bus, relay, and the bridge into dispatch
/// - `observability`: health checks and Prometheus export

pub mod transport;
pub mod cluster;
pub mod observability;

// Re-export key types
pub use cluster::{BusRelay, ClusterBridge, ClusterBus, InMemoryBus, TcpBus};
pub use observability::{HealthChecker, HealthStatus};
pub use transport::{ConnectionHub, DriverServer};
