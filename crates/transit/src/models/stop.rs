//! Stops, search hits and route geometry.

use std::sync::Arc;

use geo::LineString;
use geojson::{Feature, FeatureCollection, Geometry, Value};

use crate::identifiers::*;
use crate::models::types::Position;

/// A physical boarding point (bus stop, bay, stand)
///
/// Stops are superseded wholesale on every poll; nothing mutates one after
/// it has been decoded.
#[derive(Clone, Debug, PartialEq)]
pub struct Stop {
    pub id: StopIdentifier,
    pub name: Arc<str>,
    /// Area name, e.g. "Redcliffe"
    pub locality: Arc<str>,
    /// Street-side indicator, e.g. "Stop T3" or "opp"
    pub indicator: Arc<str>,
    pub position: Position,
    /// Only present when the query carried a reference location
    pub distance_km: Option<f64>,
}

impl Stop {
    /// Name with the indicator appended when there is one ("Temple Meads (T3)")
    pub fn display_name(&self) -> String {
        if self.indicator.trim().is_empty() {
            self.name.to_string()
        } else {
            format!("{} ({})", self.name, self.indicator)
        }
    }

    /// Copy of this stop with the distance measured from `origin`
    pub fn measured_from(&self, origin: Position) -> Self {
        Self {
            distance_km: Some(self.position.distance_km(&origin)),
            ..self.clone()
        }
    }
}

/// A stop returned by the search endpoint, ranked for the current query
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    pub stop: Stop,
    /// Higher is better; only comparable within one response
    pub relevance: f64,
}

/// Drawn path of a route plus the stops it serves, in running order
#[derive(Clone, Debug, PartialEq)]
pub struct RouteGeometry {
    pub route: RouteIdentifier,
    pub path: LineString,
    pub stops: Vec<Stop>,
}

impl RouteGeometry {
    pub fn new(route: RouteIdentifier, path: &[Position], stops: Vec<Stop>) -> Self {
        Self {
            route,
            path: path.iter().map(|p| (p.longitude, p.latitude)).collect(),
            stops,
        }
    }

    /// GeoJSON for the map widget: one LineString feature for the path and a
    /// Point feature per stop.
    pub fn to_geojson(&self) -> FeatureCollection {
        let mut features = Vec::with_capacity(self.stops.len() + 1);

        let line = self.path.coords().map(|c| vec![c.x, c.y]).collect();
        let mut path_feature = Feature::from(Geometry::new(Value::LineString(line)));
        path_feature.set_property("route", self.route.as_str());
        path_feature.set_property("kind", "path");
        features.push(path_feature);

        for (sequence, stop) in self.stops.iter().enumerate() {
            let point = Value::Point(vec![stop.position.longitude, stop.position.latitude]);
            let mut feature = Feature::from(Geometry::new(point));
            feature.set_property("kind", "stop");
            feature.set_property("id", stop.id.as_str());
            feature.set_property("name", stop.name.as_ref());
            feature.set_property("sequence", sequence as u64);
            features.push(feature);
        }

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}
