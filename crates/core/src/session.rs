//! One live map: location, feeds, navigation, camera and markers wired
//! together.
//!
//! The session owns every [`PollingDataSource`] and switches them as the
//! view changes. Nearby stops run in their own [`NearbyStops`] task, which
//! widens the search radius by itself. Feed data flows one way, from the
//! poll tasks to the panels and the marker animation; nothing here writes
//! into a feed.

use std::sync::Arc;

use futures_util::FutureExt;
use itertools::Itertools;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use transight_transit::{
    Position, RouteGeometry, RouteIdentifier, Stop, StopIdentifier, TransitBackend, Vehicle,
    VehicleIdentifier,
};

use crate::camera::{CameraController, CameraEvent, CameraMove};
use crate::config::ClientConfig;
use crate::feed::{FeedState, PollingDataSource, Schedule};
use crate::issue::ClientIssue;
use crate::location::{LocationFix, LocationSource, PositionSensor};
use crate::markers::{
    Marker, MarkerFrame, MarkerInterpolator, VehicleFeeds, VehicleLayer, spawn_animation,
};
use crate::nearby::{AreaQuery, NearbyStops};
use crate::view::{Transition, ViewError, ViewEvent, ViewState, ViewStateMachine};

#[derive(Clone, Debug, PartialEq)]
pub struct StopQuery {
    pub stop: StopIdentifier,
    pub around: Position,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StopsPanel {
    /// No location fix yet
    Locating,
    Loading,
    /// Nothing within the largest radius tried so far
    NoStopsFound { radius_km: f64 },
    Stops(Vec<Stop>),
    Unavailable,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BusesPanel {
    Loading,
    NoBuses,
    /// Soonest first
    Buses(Vec<Vehicle>),
    Unavailable,
}

/// Everything the UI draws outside the marker layer
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub view: ViewState,
    pub location: Option<LocationFix>,
    pub stops: StopsPanel,
    /// Present while a stop is selected
    pub buses: Option<BusesPanel>,
    /// Newest data for the bus in `BusDetail`
    pub tracked_bus: Option<Vehicle>,
    pub route: Option<RouteGeometry>,
    pub issues: Vec<ClientIssue>,
}

pub struct LiveMapSession {
    config: ClientConfig,
    location: Arc<LocationSource>,
    fix: Option<LocationFix>,
    view: ViewStateMachine,
    camera: CameraController,
    camera_moves: Vec<CameraMove>,

    nearby: NearbyStops,
    live: PollingDataSource<AreaQuery, Vec<Vehicle>>,
    stop_buses: PollingDataSource<StopQuery, Vec<Vehicle>>,
    route_buses: PollingDataSource<RouteIdentifier, Vec<Vehicle>>,
    route_geometry: PollingDataSource<RouteIdentifier, RouteGeometry>,

    layer: watch::Sender<VehicleLayer>,
    frames: watch::Receiver<MarkerFrame>,
    animation: JoinHandle<()>,
}

impl LiveMapSession {
    /// Must be called from within a tokio runtime.
    pub fn new(
        config: ClientConfig,
        backend: Arc<dyn TransitBackend>,
        sensor: Arc<dyn PositionSensor>,
    ) -> Self {
        let nearby = {
            let backend = Arc::clone(&backend);
            let fetch = move |q: AreaQuery| {
                let backend = Arc::clone(&backend);
                async move { backend.nearby_stops(q.around, q.radius_km).await }.boxed()
            };
            let source = PollingDataSource::new("nearby_stops", Schedule::Once, fetch);
            NearbyStops::spawn(source, config.nearby_radii_km.clone())
        };

        let live = {
            let backend = Arc::clone(&backend);
            let schedule = Schedule::Every(config.live_buses_interval());
            PollingDataSource::new("live_buses", schedule, move |q: AreaQuery| {
                let backend = Arc::clone(&backend);
                async move { backend.live_buses(q.around, q.radius_km).await }.boxed()
            })
        };

        let stop_buses = {
            let backend = Arc::clone(&backend);
            let schedule = Schedule::Every(config.stop_buses_interval());
            PollingDataSource::new("stop_buses", schedule, move |q: StopQuery| {
                let backend = Arc::clone(&backend);
                async move {
                    backend.stop_buses(&q.stop, q.around).await.map(|found| {
                        let mut buses = found.buses;
                        buses.sort_by(|a, b| a.eta_minutes.total_cmp(&b.eta_minutes));
                        buses
                    })
                }
                .boxed()
            })
        };

        let route_buses = {
            let backend = Arc::clone(&backend);
            let schedule = Schedule::Every(config.route_buses_interval());
            PollingDataSource::new("route_buses", schedule, move |route: RouteIdentifier| {
                let backend = Arc::clone(&backend);
                async move { backend.route_buses(&route).await }.boxed()
            })
        };

        let route_geometry = {
            let backend = Arc::clone(&backend);
            PollingDataSource::new("route_geometry", Schedule::Once, move |route: RouteIdentifier| {
                let backend = Arc::clone(&backend);
                async move { backend.route_geometry(&route).await }.boxed()
            })
        };

        let (layer, layer_rx) = watch::channel(VehicleLayer::NearUser);
        let feeds = VehicleFeeds {
            near_user: live.subscribe(),
            at_stop: stop_buses.subscribe(),
            route: route_buses.subscribe(),
        };
        let (animation, frames) = spawn_animation(
            MarkerInterpolator::new(config.interpolator()),
            feeds,
            layer_rx,
            config.frame_interval(),
        );

        let location = Arc::new(LocationSource::new(
            sensor,
            config.location_timeout(),
            config.fallback_position(),
        ));

        Self {
            config,
            location,
            fix: None,
            view: ViewStateMachine::new(),
            camera: CameraController::new(),
            camera_moves: Vec::new(),
            nearby,
            live,
            stop_buses,
            route_buses,
            route_geometry,
            layer,
            frames,
            animation,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Shared handle so a caller can wait for a fix without holding the
    /// session; hand the result to [`apply_location`](Self::apply_location).
    pub fn location_source(&self) -> Arc<LocationSource> {
        Arc::clone(&self.location)
    }

    /// Acquire a fix and re-centre everything on it.
    pub async fn locate(&mut self) -> LocationFix {
        let fix = self.location.acquire().await;
        self.apply_location(fix.clone());
        fix
    }

    pub fn apply_location(&mut self, fix: LocationFix) {
        let around = fix.position();
        self.fix = Some(fix);
        self.camera_event(CameraEvent::LocationFix(around));

        self.nearby.centre(around);
        if matches!(self.view.state(), ViewState::Stops) {
            self.watch_area();
        }
    }

    pub fn location_fix(&self) -> Option<&LocationFix> {
        self.fix.as_ref()
    }

    pub fn location_error(&self) -> bool {
        self.location.location_error()
    }

    pub fn view(&self) -> &ViewState {
        self.view.state()
    }

    pub fn select_stop(&mut self, stop: Stop) -> Transition {
        let transition = self.view.select_stop(stop);
        self.follow(&transition);
        transition
    }

    pub fn select_search_result(&mut self, stop: Stop) -> Transition {
        let transition = self.view.select_search_result(stop);
        self.follow(&transition);
        transition
    }

    pub fn select_bus(&mut self, bus: Vehicle) -> Result<Transition, ViewError> {
        let transition = self.view.select_bus(bus)?;
        self.follow(&transition);
        Ok(transition)
    }

    pub fn back(&mut self) -> Result<Transition, ViewError> {
        let transition = self.view.back()?;
        self.follow(&transition);
        Ok(transition)
    }

    /// Fetch every active feed again now. Never moves the camera.
    pub fn refresh(&mut self) {
        self.nearby.refresh();
        self.live.refresh();
        self.stop_buses.refresh();
        self.route_buses.refresh();
        self.camera_event(CameraEvent::PollRefresh);
    }

    /// Camera moves issued since the last call
    pub fn take_camera_moves(&mut self) -> Vec<CameraMove> {
        std::mem::take(&mut self.camera_moves)
    }

    pub fn camera_moves_issued(&self) -> u64 {
        self.camera.moves_issued()
    }

    pub fn frames(&self) -> watch::Receiver<MarkerFrame> {
        self.frames.clone()
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.frames.borrow().markers.clone()
    }

    /// Stop list for the `Stops` panel. While a wider search runs after an
    /// empty answer the panel keeps saying nothing was found.
    pub fn stops_panel(&self) -> StopsPanel {
        if self.fix.is_none() {
            return StopsPanel::Locating;
        }

        let state = self.nearby.state();
        let progress = self.nearby.progress();
        match state.data() {
            Some(stops) if !stops.is_empty() => StopsPanel::Stops(stops.clone()),
            Some(_) => StopsPanel::NoStopsFound {
                radius_km: progress.radius_km.unwrap_or_default(),
            },
            None if state.last_error().is_some() => StopsPanel::Unavailable,
            None => match progress.empty_radius {
                Some(radius_km) => StopsPanel::NoStopsFound { radius_km },
                None => StopsPanel::Loading,
            },
        }
    }

    pub fn buses_panel(&self) -> Option<BusesPanel> {
        self.view.state().stop()?;

        let state = self.stop_buses.state();
        Some(match state.data() {
            Some(buses) if buses.is_empty() => BusesPanel::NoBuses,
            Some(buses) => BusesPanel::Buses(buses.clone()),
            None if state.last_error().is_some() => BusesPanel::Unavailable,
            None => BusesPanel::Loading,
        })
    }

    /// The bus in `BusDetail`, as of the newest poll that included it
    pub fn tracked_bus(&self) -> Option<Vehicle> {
        let selected = self.view.state().bus()?;
        let find = |state: FeedState<Vec<Vehicle>>| {
            state
                .data()
                .and_then(|buses| buses.iter().find(|b| b.id == selected.id).cloned())
        };

        find(self.route_buses.state())
            .or_else(|| find(self.stop_buses.state()))
            .or_else(|| Some(selected.clone()))
    }

    pub fn route(&self) -> Option<RouteGeometry> {
        self.route_geometry.state().data().cloned()
    }

    /// A stop the user can currently see: nearby, selected, or on the
    /// displayed route.
    pub fn find_stop(&self, id: &StopIdentifier) -> Option<Stop> {
        if let Some(stop) = self.view.state().stop().filter(|s| &s.id == id) {
            return Some(stop.clone());
        }
        let in_list = |stops: &[Stop]| stops.iter().find(|s| &s.id == id).cloned();

        let nearby = self.nearby.state();
        let route = self.route_geometry.state();
        nearby
            .data()
            .and_then(|stops| in_list(stops.as_slice()))
            .or_else(|| route.data().and_then(|r| in_list(r.stops.as_slice())))
    }

    /// A vehicle from any feed currently polled
    pub fn find_bus(&self, id: &VehicleIdentifier) -> Option<Vehicle> {
        let find = |state: FeedState<Vec<Vehicle>>| {
            state
                .data()
                .and_then(|buses| buses.iter().find(|b| &b.id == id).cloned())
        };

        find(self.stop_buses.state())
            .or_else(|| find(self.route_buses.state()))
            .or_else(|| find(self.live.state()))
            .or_else(|| self.view.state().bus().filter(|b| &b.id == id).cloned())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let stops = self.stops_panel();
        let buses = self.buses_panel();
        let issues = self.issues(&stops, buses.as_ref());

        SessionSnapshot {
            view: self.view.state().clone(),
            location: self.fix.clone(),
            stops,
            buses,
            tracked_bus: self.tracked_bus(),
            route: self.route(),
            issues,
        }
    }

    fn issues(&self, stops: &StopsPanel, buses: Option<&BusesPanel>) -> Vec<ClientIssue> {
        let mut issues = Vec::new();
        if self.location.location_error() {
            issues.push(ClientIssue::LocationUnavailable);
        }

        issues.extend(
            [
                self.nearby.state().last_error().map(ClientIssue::from_error),
                self.live.state().last_error().map(ClientIssue::from_error),
                self.stop_buses.state().last_error().map(ClientIssue::from_error),
                self.route_buses.state().last_error().map(ClientIssue::from_error),
                self.route_geometry.state().last_error().map(ClientIssue::from_error),
            ]
            .into_iter()
            .flatten(),
        );

        if matches!(stops, StopsPanel::NoStopsFound { .. })
            || matches!(buses, Some(BusesPanel::NoBuses))
        {
            issues.push(ClientIssue::EmptyResult);
        }

        issues.into_iter().unique().collect()
    }

    fn around(&self) -> Position {
        self.fix
            .as_ref()
            .map(LocationFix::position)
            .unwrap_or_else(|| self.config.fallback_position())
    }

    /// Re-point the feeds and the marker layer at the new view, and let the
    /// camera react to the event.
    fn follow(&mut self, transition: &Transition) {
        let event = match &transition.to {
            _ if transition.event == ViewEvent::Back => CameraEvent::Back,
            ViewState::BusDetail { bus, .. } => CameraEvent::BusSelected(bus),
            ViewState::BusList { stop } => CameraEvent::StopSelected(stop),
            ViewState::Stops => CameraEvent::Back,
        };
        self.camera_event(event);

        match &transition.to {
            ViewState::Stops => {
                self.stop_buses.deactivate();
                self.route_buses.deactivate();
                self.route_geometry.deactivate();
                self.watch_area();
                self.show(VehicleLayer::NearUser);
            }
            ViewState::BusList { stop } => {
                self.live.deactivate();
                self.watch_stop(&stop.id);
                self.route_buses.deactivate();
                self.route_geometry.deactivate();
                self.show(VehicleLayer::AtStop);
            }
            ViewState::BusDetail { stop, bus } => {
                self.live.deactivate();
                self.watch_stop(&stop.id);
                self.route_buses.activate(bus.route.clone());
                self.route_geometry.activate(bus.route.clone());
                self.show(VehicleLayer::Route);
            }
        }
    }

    /// Buses near the user are only polled on the `Stops` level, once there
    /// is a fix to poll around.
    fn watch_area(&mut self) {
        let Some(around) = self.fix.as_ref().map(LocationFix::position) else {
            return;
        };
        self.live.activate(AreaQuery {
            around,
            radius_km: self.config.live_buses_radius_km,
        });
    }

    /// Keeps the running poll when it already belongs to `stop`
    fn watch_stop(&mut self, stop: &StopIdentifier) {
        if self.stop_buses.params().map(|q| &q.stop) == Some(stop) {
            return;
        }
        let around = self.around();
        self.stop_buses.activate(StopQuery {
            stop: stop.clone(),
            around,
        });
    }

    fn show(&self, layer: VehicleLayer) {
        self.layer.send_if_modified(|current| {
            let changed = *current != layer;
            *current = layer;
            changed
        });
    }

    fn camera_event(&mut self, event: CameraEvent<'_>) {
        if let Some(camera_move) = self.camera.handle(event) {
            self.camera_moves.push(camera_move);
        }
    }
}

impl Drop for LiveMapSession {
    fn drop(&mut self) {
        self.animation.abort();
    }
}
