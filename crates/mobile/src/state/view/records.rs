//! Plain values handed across the FFI boundary.

use transight_core::camera::CameraMove;
use transight_core::color::route_color;
use transight_core::issue::ClientIssue;
use transight_core::location::LocationFix;
use transight_core::markers::Marker;
use transight_core::search::SearchOutcome;
use transight_core::session::{BusesPanel, SessionSnapshot, StopsPanel};
use transight_core::transit::{DelayStatus, Position, SearchResult, Stop, Vehicle};
use transight_core::view::ViewState;

#[derive(Clone, Copy, Debug, PartialEq, uniffi::Record)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<Position> for GeoPoint {
    fn from(position: Position) -> Self {
        Self {
            latitude: position.latitude,
            longitude: position.longitude,
        }
    }
}

impl From<GeoPoint> for Position {
    fn from(point: GeoPoint) -> Self {
        Position::new(point.latitude, point.longitude)
    }
}

#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct StopRecord {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub locality: String,
    pub indicator: String,
    pub position: GeoPoint,
    pub distance_km: Option<f64>,
}

impl From<&Stop> for StopRecord {
    fn from(stop: &Stop) -> Self {
        Self {
            id: stop.id.to_string(),
            name: stop.name.to_string(),
            display_name: stop.display_name(),
            locality: stop.locality.to_string(),
            indicator: stop.indicator.to_string(),
            position: stop.position.into(),
            distance_km: stop.distance_km,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum Punctuality {
    Early,
    OnTime,
    Late,
}

impl From<DelayStatus> for Punctuality {
    fn from(status: DelayStatus) -> Self {
        match status {
            DelayStatus::Early => Self::Early,
            DelayStatus::OnTime => Self::OnTime,
            DelayStatus::Late => Self::Late,
        }
    }
}

#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct VehicleRecord {
    pub id: String,
    pub route: String,
    pub route_color: String,
    pub destination: String,
    pub operator: String,
    pub position: GeoPoint,
    pub bearing: f64,
    pub speed_kmh: f64,
    pub delay_minutes: f64,
    /// Absent when the service gave no estimate
    pub eta_minutes: Option<f64>,
    pub punctuality: Punctuality,
    pub next_stop: Option<String>,
    pub trail: Vec<GeoPoint>,
}

impl From<&Vehicle> for VehicleRecord {
    fn from(vehicle: &Vehicle) -> Self {
        Self {
            id: vehicle.id.to_string(),
            route: vehicle.route.to_string(),
            route_color: route_color(&vehicle.route),
            destination: vehicle.destination.to_string(),
            operator: vehicle.operator.to_string(),
            position: vehicle.position.into(),
            bearing: vehicle.normalized_bearing(),
            speed_kmh: vehicle.speed_kmh,
            delay_minutes: vehicle.delay_minutes,
            eta_minutes: Some(vehicle.eta_minutes).filter(|eta| eta.is_finite()),
            punctuality: vehicle.status().into(),
            next_stop: vehicle.next_stop_ref.as_ref().map(ToString::to_string),
            trail: vehicle.trail.iter().copied().map(GeoPoint::from).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct MarkerRecord {
    pub id: String,
    pub route: String,
    pub color: String,
    pub position: GeoPoint,
    pub bearing: f64,
    pub trail: Vec<GeoPoint>,
}

impl From<&Marker> for MarkerRecord {
    fn from(marker: &Marker) -> Self {
        Self {
            id: marker.id.to_string(),
            route: marker.route.to_string(),
            color: route_color(&marker.route),
            position: marker.displayed.into(),
            bearing: marker.bearing,
            trail: marker.trail.iter().copied().map(GeoPoint::from).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct CameraMoveRecord {
    pub target: GeoPoint,
    pub zoom: u8,
}

impl From<CameraMove> for CameraMoveRecord {
    fn from(camera_move: CameraMove) -> Self {
        Self {
            target: camera_move.target.into(),
            zoom: camera_move.zoom.level(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct LocationRecord {
    pub position: GeoPoint,
    pub is_fallback: bool,
    pub fallback_reason: Option<String>,
}

impl From<&LocationFix> for LocationRecord {
    fn from(fix: &LocationFix) -> Self {
        match fix {
            LocationFix::Located(position) => Self {
                position: (*position).into(),
                is_fallback: false,
                fallback_reason: None,
            },
            LocationFix::Fallback { position, reason } => Self {
                position: (*position).into(),
                is_fallback: true,
                fallback_reason: Some(reason.to_string()),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, uniffi::Enum)]
pub enum ViewRecord {
    Stops,
    BusList { stop: StopRecord },
    BusDetail { stop: StopRecord, bus: VehicleRecord },
}

impl From<&ViewState> for ViewRecord {
    fn from(view: &ViewState) -> Self {
        match view {
            ViewState::Stops => Self::Stops,
            ViewState::BusList { stop } => Self::BusList { stop: stop.into() },
            ViewState::BusDetail { stop, bus } => Self::BusDetail {
                stop: stop.into(),
                bus: bus.into(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, uniffi::Enum)]
pub enum StopsPanelRecord {
    Locating,
    Loading,
    NoStopsFound { radius_km: f64 },
    Stops { stops: Vec<StopRecord> },
    Unavailable,
}

impl From<&StopsPanel> for StopsPanelRecord {
    fn from(panel: &StopsPanel) -> Self {
        match panel {
            StopsPanel::Locating => Self::Locating,
            StopsPanel::Loading => Self::Loading,
            StopsPanel::NoStopsFound { radius_km } => Self::NoStopsFound {
                radius_km: *radius_km,
            },
            StopsPanel::Stops(stops) => Self::Stops {
                stops: stops.iter().map(StopRecord::from).collect(),
            },
            StopsPanel::Unavailable => Self::Unavailable,
        }
    }
}

#[derive(Clone, Debug, PartialEq, uniffi::Enum)]
pub enum BusesPanelRecord {
    Loading,
    NoBuses,
    Buses { buses: Vec<VehicleRecord> },
    Unavailable,
}

impl From<&BusesPanel> for BusesPanelRecord {
    fn from(panel: &BusesPanel) -> Self {
        match panel {
            BusesPanel::Loading => Self::Loading,
            BusesPanel::NoBuses => Self::NoBuses,
            BusesPanel::Buses(buses) => Self::Buses {
                buses: buses.iter().map(VehicleRecord::from).collect(),
            },
            BusesPanel::Unavailable => Self::Unavailable,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum IssueRecord {
    LocationUnavailable,
    NetworkTransient,
    EmptyResult,
}

impl From<ClientIssue> for IssueRecord {
    fn from(issue: ClientIssue) -> Self {
        match issue {
            ClientIssue::LocationUnavailable => Self::LocationUnavailable,
            ClientIssue::NetworkTransient => Self::NetworkTransient,
            ClientIssue::EmptyResult => Self::EmptyResult,
        }
    }
}

#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct SnapshotRecord {
    pub view: ViewRecord,
    pub location: Option<LocationRecord>,
    pub stops: StopsPanelRecord,
    pub buses: Option<BusesPanelRecord>,
    pub tracked_bus: Option<VehicleRecord>,
    pub has_route: bool,
    pub issues: Vec<IssueRecord>,
}

impl From<&SessionSnapshot> for SnapshotRecord {
    fn from(snapshot: &SessionSnapshot) -> Self {
        Self {
            view: (&snapshot.view).into(),
            location: snapshot.location.as_ref().map(LocationRecord::from),
            stops: (&snapshot.stops).into(),
            buses: snapshot.buses.as_ref().map(BusesPanelRecord::from),
            tracked_bus: snapshot.tracked_bus.as_ref().map(VehicleRecord::from),
            has_route: snapshot.route.is_some(),
            issues: snapshot.issues.iter().copied().map(IssueRecord::from).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct SearchHitRecord {
    pub stop: StopRecord,
    pub relevance: f64,
}

impl From<&SearchResult> for SearchHitRecord {
    fn from(result: &SearchResult) -> Self {
        Self {
            stop: (&result.stop).into(),
            relevance: result.relevance,
        }
    }
}

#[derive(Clone, Debug, PartialEq, uniffi::Enum)]
pub enum SearchOutcomeRecord {
    Results { hits: Vec<SearchHitRecord> },
    Empty,
    /// Drop silently; a newer query is on its way
    Superseded,
    Failed { message: String },
}

impl From<SearchOutcome> for SearchOutcomeRecord {
    fn from(outcome: SearchOutcome) -> Self {
        match outcome {
            SearchOutcome::Results(results) => Self::Results {
                hits: results.iter().map(SearchHitRecord::from).collect(),
            },
            SearchOutcome::Empty => Self::Empty,
            SearchOutcome::Superseded => Self::Superseded,
            SearchOutcome::Failed(error) => Self::Failed {
                message: error.to_string(),
            },
        }
    }
}
