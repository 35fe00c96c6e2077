use std::collections::HashMap;

use itertools::Itertools;
use transight_transit::{Position, RouteIdentifier, Vehicle, VehicleIdentifier};

/// Point a fraction `t` of the way from `prev` to `target`.
///
/// `t` is clamped to [0, 1], so the result always lies on the segment.
pub fn interpolate(prev: Position, target: Position, t: f64) -> Position {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    Position::new(
        prev.latitude + (target.latitude - prev.latitude) * t,
        prev.longitude + (target.longitude - prev.longitude) * t,
    )
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InterpolatorConfig {
    /// Share of the remaining distance covered per tick
    pub ease_fraction: f64,
    /// Snap once both axes are this close (degrees)
    pub epsilon_deg: f64,
    /// Polls a vehicle may be missing from before its marker is removed
    pub missed_polls_before_removal: u32,
}

impl Default for InterpolatorConfig {
    fn default() -> Self {
        Self {
            ease_fraction: 0.1,
            epsilon_deg: 1e-6,
            missed_polls_before_removal: 0,
        }
    }
}

/// One vehicle marker as the map should draw it this frame
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub id: VehicleIdentifier,
    pub route: RouteIdentifier,
    pub displayed: Position,
    pub target: Position,
    pub bearing: f64,
    /// As received; trails are never interpolated
    pub trail: Vec<Position>,
    pub missed_polls: u32,
}

impl Marker {
    fn new(vehicle: &Vehicle) -> Self {
        Self {
            id: vehicle.id.clone(),
            route: vehicle.route.clone(),
            displayed: vehicle.position,
            target: vehicle.position,
            bearing: vehicle.normalized_bearing(),
            trail: vehicle.trail.clone(),
            missed_polls: 0,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.displayed == self.target
    }
}

/// What one snapshot did to the marker set
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SnapshotDelta {
    pub added: usize,
    pub retargeted: usize,
    pub removed: usize,
}

/// Animated marker positions keyed by vehicle id.
///
/// Only the animation scheduler mutates this; feed data is read, never
/// written.
#[derive(Debug, Default)]
pub struct MarkerInterpolator {
    config: InterpolatorConfig,
    markers: HashMap<VehicleIdentifier, Marker>,
}

impl MarkerInterpolator {
    pub fn new(config: InterpolatorConfig) -> Self {
        Self {
            config,
            markers: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn get(&self, id: &VehicleIdentifier) -> Option<&Marker> {
        self.markers.get(id)
    }

    /// Markers ordered by id
    pub fn markers(&self) -> Vec<Marker> {
        self.markers
            .values()
            .sorted_by(|a, b| a.id.cmp(&b.id))
            .cloned()
            .collect()
    }

    pub fn is_animating(&self) -> bool {
        self.markers.values().any(|m| !m.is_settled())
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }

    /// Take a newly accepted snapshot. Known vehicles get a new target and
    /// keep their displayed position; new vehicles appear where reported.
    pub fn apply_snapshot(&mut self, vehicles: &[Vehicle]) -> SnapshotDelta {
        let mut delta = SnapshotDelta::default();

        let fresh: Vec<&Vehicle> = vehicles
            .iter()
            .filter(|v| !v.id.is_empty() && v.position.is_valid())
            .unique_by(|v| &v.id)
            .collect();

        for vehicle in &fresh {
            match self.markers.get_mut(&vehicle.id) {
                Some(marker) => {
                    marker.target = vehicle.position;
                    marker.route = vehicle.route.clone();
                    marker.bearing = vehicle.normalized_bearing();
                    marker.trail = vehicle.trail.clone();
                    marker.missed_polls = 0;
                    delta.retargeted += 1;
                }
                None => {
                    self.markers.insert(vehicle.id.clone(), Marker::new(vehicle));
                    delta.added += 1;
                }
            }
        }

        let grace = self.config.missed_polls_before_removal;
        let before = self.markers.len();
        self.markers.retain(|id, marker| {
            if fresh.iter().any(|v| &v.id == id) {
                return true;
            }
            marker.missed_polls += 1;
            marker.missed_polls <= grace
        });
        delta.removed = before - self.markers.len();

        tracing::debug!(
            added = delta.added,
            retargeted = delta.retargeted,
            removed = delta.removed,
            "markers updated"
        );
        delta
    }

    /// Advance every marker one animation step. Returns whether any marker is
    /// still moving.
    pub fn tick(&mut self) -> bool {
        let InterpolatorConfig {
            ease_fraction,
            epsilon_deg,
            ..
        } = self.config;

        let mut moving = false;
        for marker in self.markers.values_mut() {
            if marker.is_settled() {
                continue;
            }
            let next = interpolate(marker.displayed, marker.target, ease_fraction);
            let close = (marker.target.latitude - next.latitude).abs() <= epsilon_deg
                && (marker.target.longitude - next.longitude).abs() <= epsilon_deg;
            if close {
                marker.displayed = marker.target;
            } else {
                marker.displayed = next;
                moving = true;
            }
        }
        moving
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn vehicle(id: &str, lat: f64, lon: f64) -> Vehicle {
        Vehicle {
            id: VehicleIdentifier::new(id),
            route: RouteIdentifier::new("72"),
            destination: "UWE".into(),
            operator: "FBRI".into(),
            position: Position::new(lat, lon),
            bearing: 45.0,
            speed_kmh: 20.0,
            delay_minutes: 0.0,
            eta_minutes: 5.0,
            next_stop_ref: None,
            trail: vec![Position::new(lat - 0.001, lon)],
        }
    }

    #[test]
    fn interpolate_endpoints_and_clamping() {
        let a = Position::new(51.0, -2.0);
        let b = Position::new(52.0, -3.0);

        assert_eq!(interpolate(a, b, 0.0), a);
        assert_eq!(interpolate(a, b, 1.0), b);
        assert_eq!(interpolate(a, b, 2.0), b);
        assert_eq!(interpolate(a, b, -1.0), a);

        let mid = interpolate(a, b, 0.5);
        assert_relative_eq!(mid.latitude, 51.5);
        assert_relative_eq!(mid.longitude, -2.5);
    }

    #[test]
    fn first_sighting_renders_without_easing() {
        let mut interpolator = MarkerInterpolator::new(InterpolatorConfig::default());
        let delta = interpolator.apply_snapshot(&[vehicle("b1", 51.45, -2.58)]);

        assert_eq!(delta.added, 1);
        let marker = interpolator.get(&VehicleIdentifier::new("b1")).unwrap();
        assert_eq!(marker.displayed, Position::new(51.45, -2.58));
        assert!(!interpolator.is_animating());
    }

    #[test]
    fn known_vehicle_eases_monotonically_without_overshoot() {
        let mut interpolator = MarkerInterpolator::new(InterpolatorConfig::default());
        let p0 = Position::new(51.4500, -2.5800);
        let p1 = Position::new(51.4600, -2.5700);
        let id = VehicleIdentifier::new("b1");

        interpolator.apply_snapshot(&[vehicle("b1", p0.latitude, p0.longitude)]);
        interpolator.apply_snapshot(&[vehicle("b1", p1.latitude, p1.longitude)]);

        // Not snapped on arrival of the new target
        assert_eq!(interpolator.get(&id).unwrap().displayed, p0);

        let mut previous_remaining = p0.distance_m(&p1);
        let mut ticks = 0;
        while interpolator.tick() {
            let shown = interpolator.get(&id).unwrap().displayed;
            let remaining = shown.distance_m(&p1);
            assert!(remaining < previous_remaining, "marker moved away from target");
            assert!(shown.latitude >= p0.latitude && shown.latitude <= p1.latitude);
            assert!(shown.longitude >= p0.longitude && shown.longitude <= p1.longitude);
            previous_remaining = remaining;
            ticks += 1;
            assert!(ticks < 1_000, "animation never settled");
        }
        assert_eq!(interpolator.get(&id).unwrap().displayed, p1);
    }

    #[test]
    fn first_tick_covers_the_ease_fraction() {
        let mut interpolator = MarkerInterpolator::new(InterpolatorConfig::default());
        interpolator.apply_snapshot(&[vehicle("b1", 51.0, -2.0)]);
        interpolator.apply_snapshot(&[vehicle("b1", 52.0, -2.0)]);

        interpolator.tick();
        let shown = interpolator.get(&VehicleIdentifier::new("b1")).unwrap().displayed;
        assert_relative_eq!(shown.latitude, 51.1, epsilon = 1e-9);
    }

    #[test]
    fn newer_target_continues_from_displayed_position() {
        let mut interpolator = MarkerInterpolator::new(InterpolatorConfig::default());
        let id = VehicleIdentifier::new("b1");
        interpolator.apply_snapshot(&[vehicle("b1", 51.0, -2.0)]);
        interpolator.apply_snapshot(&[vehicle("b1", 52.0, -2.0)]);
        interpolator.tick();
        let midway = interpolator.get(&id).unwrap().displayed;

        interpolator.apply_snapshot(&[vehicle("b1", 51.5, -2.0)]);
        let marker = interpolator.get(&id).unwrap();
        assert_eq!(marker.displayed, midway);
        assert_eq!(marker.target, Position::new(51.5, -2.0));
    }

    #[test]
    fn missing_vehicle_is_removed() {
        let mut interpolator = MarkerInterpolator::new(InterpolatorConfig::default());
        interpolator.apply_snapshot(&[vehicle("b1", 51.0, -2.0), vehicle("b2", 51.1, -2.0)]);

        let delta = interpolator.apply_snapshot(&[vehicle("b2", 51.1, -2.0)]);
        assert_eq!(delta.removed, 1);
        assert!(interpolator.get(&VehicleIdentifier::new("b1")).is_none());
    }

    #[test]
    fn grace_period_tolerates_one_missed_poll() {
        let mut interpolator = MarkerInterpolator::new(InterpolatorConfig {
            missed_polls_before_removal: 1,
            ..InterpolatorConfig::default()
        });
        let id = VehicleIdentifier::new("b1");
        interpolator.apply_snapshot(&[vehicle("b1", 51.0, -2.0)]);

        interpolator.apply_snapshot(&[]);
        assert_eq!(interpolator.get(&id).map(|m| m.missed_polls), Some(1));

        interpolator.apply_snapshot(&[vehicle("b1", 51.0, -2.0)]);
        assert_eq!(interpolator.get(&id).map(|m| m.missed_polls), Some(0));

        interpolator.apply_snapshot(&[]);
        interpolator.apply_snapshot(&[]);
        assert!(interpolator.get(&id).is_none());
    }

    #[test]
    fn duplicate_and_invalid_vehicles_are_ignored() {
        let mut interpolator = MarkerInterpolator::new(InterpolatorConfig::default());
        let delta = interpolator.apply_snapshot(&[
            vehicle("b1", 51.0, -2.0),
            vehicle("b1", 51.2, -2.0),
            vehicle("", 51.0, -2.0),
            vehicle("b3", f64::NAN, -2.0),
        ]);

        assert_eq!(delta.added, 1);
        assert_eq!(
            interpolator.get(&VehicleIdentifier::new("b1")).map(|m| m.displayed.latitude),
            Some(51.0)
        );
    }

    #[test]
    fn trails_are_carried_as_received() {
        let mut interpolator = MarkerInterpolator::new(InterpolatorConfig::default());
        let first = vehicle("b1", 51.0, -2.0);
        let second = vehicle("b1", 51.5, -2.0);
        interpolator.apply_snapshot(std::slice::from_ref(&first));
        interpolator.apply_snapshot(std::slice::from_ref(&second));

        let marker = interpolator.get(&VehicleIdentifier::new("b1")).unwrap();
        assert_eq!(marker.trail, second.trail);
    }
}
