//! Pluggable networking traits.
//!
//! External crates implement these to provide data fetching capabilities.

use std::future::Future;
use std::pin::Pin;

use crate::identifiers::*;
use crate::models::{Position, Result, RouteGeometry, SearchResult, Stop, Vehicle};

/// Fetch raw bytes from a URL
pub trait DataFetcher: Send + Sync {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>>;
}

/// Vehicles approaching a stop, with the backend's current view of the stop
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StopBuses {
    pub buses: Vec<Vehicle>,
    pub stop: Option<Stop>,
}

/// The prediction/data service the map client polls.
///
/// Distances are kilometres. Implementations own the exact semantics of
/// ranking and ETA prediction; the client only displays what comes back.
pub trait TransitBackend: Send + Sync {
    /// Stops within `radius_km` of `around`, nearest first
    fn nearby_stops<'a>(
        &'a self,
        around: Position,
        radius_km: f64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Stop>>> + Send + 'a>>;

    /// Vehicles heading for `stop`
    fn stop_buses<'a>(
        &'a self,
        stop: &'a StopIdentifier,
        around: Position,
    ) -> Pin<Box<dyn Future<Output = Result<StopBuses>> + Send + 'a>>;

    /// Drawn path and ordered stop list of a route
    fn route_geometry<'a>(
        &'a self,
        route: &'a RouteIdentifier,
    ) -> Pin<Box<dyn Future<Output = Result<RouteGeometry>> + Send + 'a>>;

    /// Every vehicle currently running on a route
    fn route_buses<'a>(
        &'a self,
        route: &'a RouteIdentifier,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vehicle>>> + Send + 'a>>;

    /// Vehicles within `radius_km` of `around`
    fn live_buses<'a>(
        &'a self,
        around: Position,
        radius_km: f64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vehicle>>> + Send + 'a>>;

    /// Stops whose name matches `query`, best match first
    fn search_stops<'a>(
        &'a self,
        query: &'a str,
        around: Option<Position>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SearchResult>>> + Send + 'a>>;
}
