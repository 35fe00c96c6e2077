//! In-memory transit backend.
//!
//! Stores stops, live vehicles and route geometry in memory with an R-tree
//! over stop locations, and answers every [`TransitBackend`] query from it.
//! Used for offline demos and as the backend in tests.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rstar::RTree;

use crate::identifiers::*;
use crate::models::*;
use crate::network::traits::{StopBuses, TransitBackend};
use crate::spatial::index::StopNode;
use crate::spatial::queries::search_radius_degrees;

/// Maximum number of hits a search returns
pub const SEARCH_LIMIT: usize = 20;

// ============================================================================
// Static Provider
// ============================================================================

/// In-memory backend with spatial indexing
///
/// This type is cheap to clone since all data is stored in `Arc`s.
#[derive(Clone)]
pub struct StaticTransitProvider {
    // Core data
    stops: Vec<Arc<Stop>>,
    vehicles: Arc<[Vehicle]>,

    // Lookup maps
    stop_map: HashMap<StopIdentifier, Arc<Stop>>,
    route_map: HashMap<RouteIdentifier, Arc<RouteGeometry>>,

    // Spatial indices
    stop_tree: RTree<StopNode>,
}

impl StaticTransitProvider {
    /// Create a new empty provider
    pub fn new() -> Self {
        Self::from_data(Vec::new(), Vec::new(), Vec::new())
    }

    /// Build provider from raw data
    pub fn from_data(stops: Vec<Stop>, routes: Vec<RouteGeometry>, vehicles: Vec<Vehicle>) -> Self {
        let stops: Vec<Arc<Stop>> = stops.into_iter().map(Arc::new).collect();

        // Build lookup maps
        let stop_map: HashMap<_, _> = stops
            .iter()
            .map(|s| (s.id.clone(), s.clone()))
            .collect();

        let route_map: HashMap<_, _> = routes
            .into_iter()
            .map(|r| (r.route.clone(), Arc::new(r)))
            .collect();

        // Build spatial index
        let stop_tree = RTree::bulk_load(stops.iter().cloned().map(StopNode::new).collect());

        Self {
            stops,
            vehicles: vehicles.into(),
            stop_map,
            route_map,
            stop_tree,
        }
    }

    pub fn stop(&self, id: &StopIdentifier) -> Option<&Stop> {
        self.stop_map.get(id).map(|s| s.as_ref())
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    /// Stops within `radius_km` of `around`, nearest first, distances filled in
    pub fn stops_near(&self, around: Position, radius_km: f64) -> Vec<Stop> {
        // Validate radius is positive
        if radius_km <= 0.0 || !radius_km.is_finite() {
            return Vec::new();
        }

        let radius_m = radius_km * 1000.0;
        let radius_deg = search_radius_degrees(around.latitude, radius_m);

        let mut nearby: Vec<Stop> = self
            .stop_tree
            .locate_within_distance([around.longitude, around.latitude], radius_deg * radius_deg)
            .filter(|node| node.stop.position.distance_m(&around) <= radius_m)
            .map(|node| node.stop.measured_from(around))
            .collect();

        nearby.sort_by(|a, b| {
            a.distance_km
                .unwrap_or(f64::INFINITY)
                .total_cmp(&b.distance_km.unwrap_or(f64::INFINITY))
        });
        nearby
    }

    pub fn vehicles_near(&self, around: Position, radius_km: f64) -> Vec<Vehicle> {
        if radius_km <= 0.0 || !radius_km.is_finite() {
            return Vec::new();
        }

        self.vehicles
            .iter()
            .filter(|v| v.position.distance_km(&around) <= radius_km)
            .cloned()
            .collect()
    }

    /// Vehicles whose next stop is `stop`, soonest first
    pub fn vehicles_for_stop(&self, stop: &StopIdentifier) -> Vec<Vehicle> {
        let mut buses: Vec<Vehicle> = self
            .vehicles
            .iter()
            .filter(|v| v.next_stop_ref.as_ref() == Some(stop))
            .cloned()
            .collect();
        buses.sort_by(|a, b| a.eta_minutes.total_cmp(&b.eta_minutes));
        buses
    }

    pub fn vehicles_on_route(&self, route: &RouteIdentifier) -> Vec<Vehicle> {
        self.vehicles
            .iter()
            .filter(|v| &v.route == route)
            .cloned()
            .collect()
    }

    /// Case-insensitive name search
    pub fn search(&self, query: &str, around: Option<Position>) -> Vec<SearchResult> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<SearchResult> = self
            .stops
            .iter()
            .filter_map(|stop| {
                let relevance = relevance(&needle, stop)?;
                let stop = match around {
                    Some(origin) => stop.measured_from(origin),
                    None => stop.as_ref().clone(),
                };
                Some(SearchResult { stop, relevance })
            })
            .collect();

        results.sort_by(|a, b| {
            b.relevance.total_cmp(&a.relevance).then_with(|| {
                a.stop
                    .distance_km
                    .unwrap_or(f64::INFINITY)
                    .total_cmp(&b.stop.distance_km.unwrap_or(f64::INFINITY))
            })
        });
        results.truncate(SEARCH_LIMIT);
        results
    }
}

/// Name prefix beats word prefix beats substring beats locality match
fn relevance(needle: &str, stop: &Stop) -> Option<f64> {
    let name = stop.name.to_lowercase();

    if name.starts_with(needle) {
        Some(1.0)
    } else if name.split_whitespace().any(|word| word.starts_with(needle)) {
        Some(0.75)
    } else if name.contains(needle) {
        Some(0.5)
    } else if stop.locality.to_lowercase().contains(needle) {
        Some(0.25)
    } else {
        None
    }
}

impl Default for StaticTransitProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitBackend for StaticTransitProvider {
    fn nearby_stops<'a>(
        &'a self,
        around: Position,
        radius_km: f64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Stop>>> + Send + 'a>> {
        Box::pin(async move { Ok(self.stops_near(around, radius_km)) })
    }

    fn stop_buses<'a>(
        &'a self,
        stop: &'a StopIdentifier,
        around: Position,
    ) -> Pin<Box<dyn Future<Output = Result<StopBuses>> + Send + 'a>> {
        Box::pin(async move {
            let found = self
                .stop(stop)
                .ok_or_else(|| TransitError::StopNotFound(stop.clone()))?;

            Ok(StopBuses {
                buses: self.vehicles_for_stop(stop),
                stop: Some(found.measured_from(around)),
            })
        })
    }

    fn route_geometry<'a>(
        &'a self,
        route: &'a RouteIdentifier,
    ) -> Pin<Box<dyn Future<Output = Result<RouteGeometry>> + Send + 'a>> {
        Box::pin(async move {
            self.route_map
                .get(route)
                .map(|r| r.as_ref().clone())
                .ok_or_else(|| TransitError::RouteNotFound(route.clone()))
        })
    }

    fn route_buses<'a>(
        &'a self,
        route: &'a RouteIdentifier,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vehicle>>> + Send + 'a>> {
        Box::pin(async move { Ok(self.vehicles_on_route(route)) })
    }

    fn live_buses<'a>(
        &'a self,
        around: Position,
        radius_km: f64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vehicle>>> + Send + 'a>> {
        Box::pin(async move { Ok(self.vehicles_near(around, radius_km)) })
    }

    fn search_stops<'a>(
        &'a self,
        query: &'a str,
        around: Option<Position>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SearchResult>>> + Send + 'a>> {
        Box::pin(async move { Ok(self.search(query, around)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::LineString;

    fn stop(id: &str, name: &str, lat: f64, lon: f64) -> Stop {
        Stop {
            id: StopIdentifier::new(id),
            name: name.into(),
            locality: "Bristol".into(),
            indicator: "".into(),
            position: Position::new(lat, lon),
            distance_km: None,
        }
    }

    fn vehicle(id: &str, route: &str, next_stop: Option<&str>, eta: f64) -> Vehicle {
        Vehicle {
            id: VehicleIdentifier::new(id),
            route: RouteIdentifier::new(route),
            destination: "UWE".into(),
            operator: "FBRI".into(),
            position: Position::new(51.4532, -2.5815),
            bearing: 0.0,
            speed_kmh: 18.0,
            delay_minutes: 0.0,
            eta_minutes: eta,
            next_stop_ref: next_stop.map(StopIdentifier::new),
            trail: Vec::new(),
        }
    }

    fn bristol() -> StaticTransitProvider {
        StaticTransitProvider::from_data(
            vec![
                stop("temple", "Temple Meads Station", 51.4496, -2.5811),
                stop("cabot", "Cabot Circus", 51.4586, -2.5843),
                stop("market", "St Nicholas Market", 51.4510, -2.5880),
                stop("uwe", "UWE Frenchay", 51.5000, -2.5480),
            ],
            vec![RouteGeometry {
                route: RouteIdentifier::new("72"),
                path: LineString::from(vec![(-2.5811, 51.4496), (-2.5480, 51.5000)]),
                stops: Vec::new(),
            }],
            vec![
                vehicle("b1", "72", Some("cabot"), 6.0),
                vehicle("b2", "72", Some("cabot"), 2.0),
                vehicle("b3", "10", Some("temple"), 1.0),
            ],
        )
    }

    #[test]
    fn test_empty_provider() {
        let provider = StaticTransitProvider::new();
        assert_eq!(provider.stop_count(), 0);
        assert!(provider.stops_near(Position::new(51.45, -2.58), 1.0).is_empty());
    }

    #[test]
    fn test_stops_near_sorted_with_distance() {
        let provider = bristol();
        let nearby = provider.stops_near(Position::new(51.4496, -2.5811), 1.5);

        let ids: Vec<&str> = nearby.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["temple", "market", "cabot"]);
        assert!(nearby.iter().all(|s| s.distance_km.is_some()));
    }

    #[test]
    fn test_stops_near_finds_stops_east_and_west() {
        // 0.012 degrees of longitude is roughly 830 m at Bristol's latitude
        let provider = StaticTransitProvider::from_data(
            vec![
                stop("east", "East", 51.45, -2.568),
                stop("west", "West", 51.45, -2.592),
            ],
            Vec::new(),
            Vec::new(),
        );

        assert_eq!(provider.stops_near(Position::new(51.45, -2.58), 1.0).len(), 2);
    }

    #[test]
    fn test_invalid_radius() {
        let provider = bristol();
        assert!(provider.stops_near(Position::new(51.45, -2.58), -1.0).is_empty());
        assert!(provider.stops_near(Position::new(51.45, -2.58), f64::NAN).is_empty());
    }

    #[test]
    fn test_vehicles_for_stop_soonest_first() {
        let provider = bristol();
        let buses = provider.vehicles_for_stop(&StopIdentifier::new("cabot"));

        let ids: Vec<&str> = buses.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["b2", "b1"]);
    }

    #[test]
    fn test_search_ranking() {
        let provider = bristol();

        let results = provider.search("cab", None);
        assert_eq!(results[0].stop.id.as_str(), "cabot");
        assert_eq!(results[0].relevance, 1.0);

        let results = provider.search("MARKET", None);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].relevance, 0.75);

        assert!(provider.search("   ", None).is_empty());
    }

    #[tokio::test]
    async fn test_backend_unknown_stop() {
        let provider = bristol();
        let err = provider
            .stop_buses(&StopIdentifier::new("nowhere"), Position::new(51.45, -2.58))
            .await
            .unwrap_err();

        assert!(matches!(err, TransitError::StopNotFound(_)));
    }

    #[tokio::test]
    async fn test_backend_route_queries() {
        let provider = bristol();
        let route = RouteIdentifier::new("72");

        assert_eq!(provider.route_buses(&route).await.unwrap().len(), 2);
        assert!(provider.route_geometry(&route).await.is_ok());
        assert!(matches!(
            provider.route_geometry(&RouteIdentifier::new("999")).await,
            Err(TransitError::RouteNotFound(_))
        ));
    }
}
