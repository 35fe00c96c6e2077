//! Transit data models and types.

pub mod stop;
pub mod types;
pub mod vehicle;

// Re-exports for convenience
pub use stop::{RouteGeometry, SearchResult, Stop};
pub use types::{DelayStatus, Position, Result, TransitError};
pub use vehicle::{bounded_trail, Vehicle, MAX_TRAIL_LEN};
