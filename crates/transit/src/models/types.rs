//! Core data types and enums for transit data.

use geo::{HaversineDistance, Point};

use crate::identifiers::*;

// ============================================================================
// Position
// ============================================================================

/// A WGS84 coordinate in degrees.
///
/// Stored latitude-first because every backend payload and every map widget
/// this client talks to orders coordinates that way. Converts to a
/// [`geo::Point`] (x = longitude, y = latitude) for distance maths.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn to_point(self) -> Point {
        Point::new(self.longitude, self.latitude)
    }

    /// True when both components are finite and inside the WGS84 range
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance in meters
    pub fn distance_m(&self, other: &Position) -> f64 {
        self.to_point().haversine_distance(&other.to_point())
    }

    pub fn distance_km(&self, other: &Position) -> f64 {
        self.distance_m(other) / 1000.0
    }
}

impl From<Point> for Position {
    fn from(point: Point) -> Self {
        Self::new(point.y(), point.x())
    }
}

impl From<Position> for Point {
    fn from(position: Position) -> Self {
        position.to_point()
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Punctuality class derived from a vehicle's reported delay
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DelayStatus {
    Early,
    OnTime,
    Late,
}

impl DelayStatus {
    /// Delays within this many minutes either side of schedule count as on time
    pub const ON_TIME_WINDOW_MINUTES: f64 = 1.0;

    pub fn from_delay_minutes(delay: f64) -> Self {
        if delay > Self::ON_TIME_WINDOW_MINUTES {
            Self::Late
        } else if delay < -Self::ON_TIME_WINDOW_MINUTES {
            Self::Early
        } else {
            Self::OnTime
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum TransitError {
    #[error("Stop not found: {0}")]
    StopNotFound(StopIdentifier),

    #[error("Route not found: {0}")]
    RouteNotFound(RouteIdentifier),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl TransitError {
    /// The service answered, but the stop, route or resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::StopNotFound(_) | Self::RouteNotFound(_) | Self::NotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TransitError>;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_position_point_roundtrip_keeps_axis_order() {
        let position = Position::new(51.4545, -2.5879);
        let point = position.to_point();

        assert_eq!(point.x(), -2.5879);
        assert_eq!(point.y(), 51.4545);
        assert_eq!(Position::from(point), position);
    }

    #[test]
    fn test_position_distance() {
        // Temple Meads to Cabot Circus is a little under a kilometre
        let temple_meads = Position::new(51.4496, -2.5811);
        let cabot_circus = Position::new(51.4545, -2.5879);

        let dist = temple_meads.distance_km(&cabot_circus);
        assert!(dist > 0.6 && dist < 0.9, "got {dist}");
        assert_relative_eq!(temple_meads.distance_m(&temple_meads), 0.0);
    }

    #[test]
    fn test_position_validity() {
        assert!(Position::new(51.45, -2.58).is_valid());
        assert!(!Position::new(91.0, 0.0).is_valid());
        assert!(!Position::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_delay_status() {
        assert_eq!(DelayStatus::from_delay_minutes(0.5), DelayStatus::OnTime);
        assert_eq!(DelayStatus::from_delay_minutes(4.0), DelayStatus::Late);
        assert_eq!(DelayStatus::from_delay_minutes(-2.0), DelayStatus::Early);
    }

    #[test]
    fn test_not_found_kinds() {
        assert!(TransitError::NotFound("/stop/x/buses".into()).is_not_found());
        assert!(TransitError::RouteNotFound("72".into()).is_not_found());
        assert!(!TransitError::Network("timeout".into()).is_not_found());
    }
}
