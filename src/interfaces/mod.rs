/// Interfaces Layer - External Entry Points
///
/// ## Modules
/// - `cli`: Command-line interface and process wiring (main.rs logic)
/// - `http`: Booking ingestion over HTTP (`POST /emit`)
///
/// The driver-facing TCP transport lives in `infrastructure::transport`.

pub mod cli;
pub mod http;
