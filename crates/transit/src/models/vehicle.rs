//! Live vehicles as reported by the backend.

use std::sync::Arc;

use crate::identifiers::*;
use crate::models::types::{DelayStatus, Position};

/// Upper bound on trail points kept per vehicle
pub const MAX_TRAIL_LEN: usize = 20;

/// A vehicle in service, as of one poll
///
/// `id` is stable across polls and is the join key for marker animation.
#[derive(Clone, Debug, PartialEq)]
pub struct Vehicle {
    pub id: VehicleIdentifier,
    pub route: RouteIdentifier,
    pub destination: Arc<str>,
    pub operator: Arc<str>,
    pub position: Position,
    /// Heading in degrees clockwise from north
    pub bearing: f64,
    pub speed_kmh: f64,
    /// Positive when running late
    pub delay_minutes: f64,
    pub eta_minutes: f64,
    pub next_stop_ref: Option<StopIdentifier>,
    /// Recent recorded positions, oldest first
    pub trail: Vec<Position>,
}

impl Vehicle {
    pub fn status(&self) -> DelayStatus {
        DelayStatus::from_delay_minutes(self.delay_minutes)
    }

    /// Bearing folded into [0, 360)
    pub fn normalized_bearing(&self) -> f64 {
        if self.bearing.is_finite() {
            self.bearing.rem_euclid(360.0)
        } else {
            0.0
        }
    }
}

/// Keep only the newest `MAX_TRAIL_LEN` points, preserving order.
pub fn bounded_trail(mut trail: Vec<Position>) -> Vec<Position> {
    if trail.len() > MAX_TRAIL_LEN {
        trail.drain(..trail.len() - MAX_TRAIL_LEN);
    }
    trail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_trail_drops_oldest() {
        let trail: Vec<Position> = (0..30)
            .map(|i| Position::new(51.0 + i as f64 * 0.001, -2.5))
            .collect();

        let bounded = bounded_trail(trail.clone());
        assert_eq!(bounded.len(), MAX_TRAIL_LEN);
        assert_eq!(bounded.first(), trail.get(10));
        assert_eq!(bounded.last(), trail.last());
    }

    #[test]
    fn test_short_trail_untouched() {
        let trail = vec![Position::new(51.0, -2.5), Position::new(51.1, -2.5)];
        assert_eq!(bounded_trail(trail.clone()), trail);
    }

    #[test]
    fn test_normalized_bearing() {
        let mut vehicle = Vehicle {
            id: VehicleIdentifier::new("v1"),
            route: RouteIdentifier::new("72"),
            destination: "UWE".into(),
            operator: "FBRI".into(),
            position: Position::new(51.45, -2.58),
            bearing: -90.0,
            speed_kmh: 20.0,
            delay_minutes: 3.0,
            eta_minutes: 4.0,
            next_stop_ref: None,
            trail: Vec::new(),
        };
        assert_eq!(vehicle.normalized_bearing(), 270.0);
        assert_eq!(vehicle.status(), DelayStatus::Late);

        vehicle.bearing = f64::NAN;
        assert_eq!(vehicle.normalized_bearing(), 0.0);
    }
}
