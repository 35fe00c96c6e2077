//! When the map is allowed to move on its own.
//!
//! Only explicit events recenter the camera. Poll refreshes never do, so a
//! user panning the map is not fought by background updates.

use transight_transit::{Position, Stop, Vehicle, VehicleIdentifier};

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum Zoom {
    Street,
    Stop,
    Vehicle,
}

impl Zoom {
    /// Web-mercator zoom level for the map widget
    pub fn level(self) -> u8 {
        match self {
            Self::Street => 15,
            Self::Stop => 17,
            Self::Vehicle => 18,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraMove {
    pub target: Position,
    pub zoom: Zoom,
}

#[derive(Clone, Debug)]
pub enum CameraEvent<'a> {
    LocationFix(Position),
    StopSelected(&'a Stop),
    BusSelected(&'a Vehicle),
    /// Background data arrived; never moves the camera
    PollRefresh,
    /// Back navigation; the user keeps whatever framing they had
    Back,
}

#[derive(Debug, Default)]
pub struct CameraController {
    tracked_bus: Option<VehicleIdentifier>,
    moves_issued: u64,
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn moves_issued(&self) -> u64 {
        self.moves_issued
    }

    pub fn handle(&mut self, event: CameraEvent<'_>) -> Option<CameraMove> {
        let camera_move = match event {
            CameraEvent::LocationFix(position) => CameraMove {
                target: position,
                zoom: Zoom::Street,
            },
            CameraEvent::StopSelected(stop) => {
                self.tracked_bus = None;
                CameraMove {
                    target: stop.position,
                    zoom: Zoom::Stop,
                }
            }
            CameraEvent::BusSelected(bus) => {
                if self.tracked_bus.as_ref() == Some(&bus.id) {
                    return None;
                }
                self.tracked_bus = Some(bus.id.clone());
                CameraMove {
                    target: bus.position,
                    zoom: Zoom::Vehicle,
                }
            }
            CameraEvent::Back => {
                self.tracked_bus = None;
                return None;
            }
            CameraEvent::PollRefresh => return None,
        };

        self.moves_issued += 1;
        tracing::info!(
            zoom = %camera_move.zoom,
            lat = camera_move.target.latitude,
            lon = camera_move.target.longitude,
            "camera move"
        );
        Some(camera_move)
    }
}

#[cfg(test)]
mod tests {
    use transight_transit::{RouteIdentifier, StopIdentifier};

    use super::*;

    fn stop() -> Stop {
        Stop {
            id: StopIdentifier::new("s1"),
            name: "Cabot Circus".into(),
            locality: "Broadmead".into(),
            indicator: "".into(),
            position: Position::new(51.4586, -2.5843),
            distance_km: None,
        }
    }

    fn bus(id: &str, lat: f64) -> Vehicle {
        Vehicle {
            id: VehicleIdentifier::new(id),
            route: RouteIdentifier::new("72"),
            destination: "UWE".into(),
            operator: "FBRI".into(),
            position: Position::new(lat, -2.58),
            bearing: 0.0,
            speed_kmh: 0.0,
            delay_minutes: 0.0,
            eta_minutes: 3.0,
            next_stop_ref: None,
            trail: Vec::new(),
        }
    }

    #[test]
    fn explicit_events_move_the_camera() {
        let mut camera = CameraController::new();

        let fix = camera.handle(CameraEvent::LocationFix(Position::new(51.45, -2.58)));
        assert_eq!(fix.map(|m| m.zoom), Some(Zoom::Street));

        let at_stop = camera.handle(CameraEvent::StopSelected(&stop()));
        assert_eq!(at_stop.map(|m| m.zoom.level()), Some(17));

        let at_bus = camera.handle(CameraEvent::BusSelected(&bus("b1", 51.46)));
        assert_eq!(at_bus.map(|m| m.target.latitude), Some(51.46));

        assert_eq!(camera.moves_issued(), 3);
    }

    #[test]
    fn poll_refreshes_never_move_the_camera() {
        let mut camera = CameraController::new();
        for _ in 0..50 {
            assert_eq!(camera.handle(CameraEvent::PollRefresh), None);
        }
        assert_eq!(camera.moves_issued(), 0);
    }

    #[test]
    fn same_bus_is_not_refollowed_when_it_moves() {
        let mut camera = CameraController::new();
        assert!(camera.handle(CameraEvent::BusSelected(&bus("b1", 51.46))).is_some());
        assert!(camera.handle(CameraEvent::BusSelected(&bus("b1", 51.47))).is_none());
        assert!(camera.handle(CameraEvent::BusSelected(&bus("b2", 51.47))).is_some());
        assert_eq!(camera.moves_issued(), 2);
    }

    #[test]
    fn reselecting_after_back_moves_again() {
        let mut camera = CameraController::new();
        camera.handle(CameraEvent::BusSelected(&bus("b1", 51.46)));
        assert_eq!(camera.handle(CameraEvent::Back), None);
        assert!(camera.handle(CameraEvent::BusSelected(&bus("b1", 51.46))).is_some());
    }
}
