//! JSON shapes of the prediction service.
//!
//! Field aliases accept both the short names and the older long-form names
//! (`stop_id`, `bus_id`, `nearby_stops`). Vehicles and stops that fail
//! validation are dropped from a list rather than failing the whole poll.

use serde::Deserialize;
use transight_transit::{
    Position, Result, RouteGeometry, RouteIdentifier, SearchResult, Stop, StopBuses,
    StopIdentifier, TransitError, Vehicle, VehicleIdentifier, bounded_trail,
};

#[derive(Debug, Deserialize)]
pub(crate) struct StopDto {
    #[serde(alias = "stop_id", alias = "atco_code")]
    id: String,
    name: String,
    locality: Option<String>,
    indicator: Option<String>,
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    longitude: f64,
    distance_km: Option<f64>,
}

impl TryFrom<StopDto> for Stop {
    type Error = TransitError;

    fn try_from(dto: StopDto) -> Result<Self> {
        let position = Position::new(dto.latitude, dto.longitude);
        if dto.id.trim().is_empty() || !position.is_valid() {
            return Err(TransitError::InvalidData(format!("stop {:?}", dto.id)));
        }
        Ok(Stop {
            id: StopIdentifier::new(dto.id.trim()),
            name: dto.name.into(),
            locality: dto.locality.unwrap_or_default().into(),
            indicator: dto.indicator.unwrap_or_default().into(),
            position,
            distance_km: dto.distance_km.filter(|d| d.is_finite() && *d >= 0.0),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct VehicleDto {
    #[serde(alias = "bus_id", alias = "vehicle_id")]
    id: String,
    #[serde(alias = "route_id", alias = "line")]
    route: String,
    destination: Option<String>,
    operator: Option<String>,
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    longitude: f64,
    bearing: Option<f64>,
    #[serde(alias = "speed")]
    speed_kmh: Option<f64>,
    delay_minutes: Option<f64>,
    #[serde(alias = "eta")]
    eta_minutes: Option<f64>,
    #[serde(alias = "next_stop")]
    next_stop_ref: Option<String>,
    /// `[latitude, longitude]` pairs, oldest first
    trail: Option<Vec<[f64; 2]>>,
}

impl TryFrom<VehicleDto> for Vehicle {
    type Error = TransitError;

    fn try_from(dto: VehicleDto) -> Result<Self> {
        let position = Position::new(dto.latitude, dto.longitude);
        if dto.id.trim().is_empty() || !position.is_valid() {
            return Err(TransitError::InvalidData(format!("vehicle {:?}", dto.id)));
        }

        let trail = dto
            .trail
            .unwrap_or_default()
            .into_iter()
            .map(|[lat, lon]| Position::new(lat, lon))
            .filter(Position::is_valid)
            .collect();

        Ok(Vehicle {
            id: VehicleIdentifier::new(dto.id.trim()),
            route: RouteIdentifier::new(dto.route.trim()),
            destination: dto.destination.unwrap_or_default().into(),
            operator: dto.operator.unwrap_or_default().into(),
            position,
            bearing: dto.bearing.unwrap_or(0.0),
            speed_kmh: dto.speed_kmh.unwrap_or(0.0),
            delay_minutes: dto.delay_minutes.unwrap_or(0.0),
            eta_minutes: dto.eta_minutes.unwrap_or(f64::INFINITY),
            next_stop_ref: dto
                .next_stop_ref
                .filter(|s| !s.trim().is_empty())
                .map(StopIdentifier::new),
            trail: bounded_trail(trail),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StopsResponse {
    #[serde(alias = "nearby_stops")]
    stops: Vec<StopDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BusesResponse {
    buses: Vec<VehicleDto>,
    #[serde(alias = "stop")]
    stop_data: Option<StopDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResultDto {
    #[serde(flatten)]
    stop: StopDto,
    relevance: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    results: Vec<SearchResultDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RouteGeometryResponse {
    #[serde(alias = "polyline", alias = "coordinates")]
    path: Vec<[f64; 2]>,
    stops: Vec<StopDto>,
}

pub(crate) fn decode<'de, T: Deserialize<'de>>(body: &'de [u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| TransitError::Decode(e.to_string()))
}

/// Convert every valid item, logging how many were dropped
fn convert_all<D, T>(kind: &'static str, items: Vec<D>) -> Vec<T>
where
    T: TryFrom<D, Error = TransitError>,
{
    let total = items.len();
    let converted: Vec<T> = items.into_iter().filter_map(|d| T::try_from(d).ok()).collect();
    if converted.len() < total {
        tracing::warn!(kind, dropped = total - converted.len(), "skipped invalid records");
    }
    converted
}

impl StopsResponse {
    pub(crate) fn into_stops(self) -> Vec<Stop> {
        convert_all("stop", self.stops)
    }
}

impl BusesResponse {
    pub(crate) fn into_vehicles(self) -> Vec<Vehicle> {
        convert_all("vehicle", self.buses)
    }

    pub(crate) fn into_stop_buses(self) -> StopBuses {
        let stop = self.stop_data.and_then(|s| Stop::try_from(s).ok());
        StopBuses {
            buses: convert_all("vehicle", self.buses),
            stop,
        }
    }
}

impl SearchResponse {
    pub(crate) fn into_results(self) -> Vec<SearchResult> {
        let total = self.results.len();
        self.results
            .into_iter()
            .enumerate()
            .filter_map(|(rank, dto)| {
                // Without a score, keep the server's order
                let relevance = dto.relevance.unwrap_or((total - rank) as f64 / total as f64);
                Stop::try_from(dto.stop)
                    .ok()
                    .map(|stop| SearchResult { stop, relevance })
            })
            .collect()
    }
}

impl RouteGeometryResponse {
    pub(crate) fn into_geometry(self, route: RouteIdentifier) -> RouteGeometry {
        let path: Vec<Position> = self
            .path
            .into_iter()
            .map(|[lat, lon]| Position::new(lat, lon))
            .filter(Position::is_valid)
            .collect();
        RouteGeometry::new(route, &path, convert_all("stop", self.stops))
    }
}
