/// Application Services
///
/// Services coordinate domain logic to implement application workflows.
///
/// - `DispatchEngine`: presence hooks and the single-pass booking dispatch

pub mod dispatch_engine;

pub use dispatch_engine::{DispatchEngine, DispatchOrigin};
