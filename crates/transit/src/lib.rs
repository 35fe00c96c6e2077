//! # transight-transit
//!
//! Data model and backend interface for the Transight live map client.
//!
//! ## Features
//!
//! - **Typed identifiers**: cheap-to-clone ids for stops, vehicles and routes
//! - **Spatial queries**: R-tree backed nearby-stop lookups with haversine distances
//! - **Pluggable networking**: implement [`TransitBackend`] or [`DataFetcher`] to
//!   point the client at any prediction service
//! - **Offline backend**: [`StaticTransitProvider`] answers every query from memory
//!
//! ## Example
//!
//! ```
//! use transight_transit::prelude::*;
//!
//! let stop = Stop {
//!     id: StopIdentifier::new("0100BRP90312"),
//!     name: "Temple Meads Station".into(),
//!     locality: "Redcliffe".into(),
//!     indicator: "T3".into(),
//!     position: Position::new(51.4496, -2.5811),
//!     distance_km: None,
//! };
//!
//! let provider = StaticTransitProvider::from_data(vec![stop], vec![], vec![]);
//!
//! // Query stops
//! let user = Position::new(51.4545, -2.5879); // Cabot Circus
//! let nearby = provider.stops_near(user, 1.0); // 1km radius
//! assert_eq!(nearby.len(), 1);
//! ```

pub mod identifiers;
pub mod models;
pub mod provider;
pub mod spatial;
pub mod network;

// Re-exports for convenience
pub mod prelude {
    pub use crate::identifiers::*;
    pub use crate::models::*;
    pub use crate::provider::static_provider::StaticTransitProvider;
    pub use crate::network::traits::*;
}

pub use prelude::*;
