use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use eyre::WrapErr;
use tokio::runtime::Runtime;
use transight_core::transit::{RouteIdentifier, StopIdentifier, TransitBackend, VehicleIdentifier};
use transight_core::{
    ClientConfig, HttpBackend, LiveMapSession, ReqwestFetcher, SearchIndexClient, ViewError,
};

use crate::logging::setup_logging;
use location::{DeviceLocation, DeviceSensor};
use records::{
    CameraMoveRecord, LocationRecord, MarkerRecord, SearchOutcomeRecord, SnapshotRecord,
};

pub mod location;
pub mod records;

#[derive(Debug, thiserror::Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum MapError {
    #[error("{0}")]
    Setup(String),
    #[error(transparent)]
    Navigation(#[from] ViewError),
    #[error("{0} is not on the map")]
    NotFound(String),
    #[error("{0}")]
    Runtime(String),
}

/// One live map screen.
///
/// Every method may be called from any platform thread. Async methods run on
/// the map's own runtime.
#[derive(uniffi::Object)]
pub struct LiveMap {
    session: Arc<Mutex<LiveMapSession>>,
    search: Arc<SearchIndexClient>,
    runtime: Runtime,
}

impl std::fmt::Debug for LiveMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveMap").finish_non_exhaustive()
    }
}

fn build(config_json: &str, device: Arc<dyn DeviceLocation>) -> eyre::Result<LiveMap> {
    let config = ClientConfig::from_json(config_json).wrap_err("reading map config")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("transight")
        .build()
        .wrap_err("starting map runtime")?;

    let fetcher = ReqwestFetcher::new(config.request_timeout()).wrap_err("creating http client")?;
    let backend: Arc<dyn TransitBackend> = Arc::new(
        HttpBackend::new(&config.backend_url, fetcher).wrap_err("parsing backend url")?,
    );
    let search = SearchIndexClient::new(
        Arc::clone(&backend),
        config.search_debounce(),
        config.search_min_chars,
    );

    let session = {
        let _guard = runtime.enter();
        LiveMapSession::new(config, backend, Arc::new(DeviceSensor::new(device)))
    };

    Ok(LiveMap {
        session: Arc::new(Mutex::new(session)),
        search: Arc::new(search),
        runtime,
    })
}

impl LiveMap {
    fn lock(&self) -> MutexGuard<'_, LiveMapSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` on the session with this map's runtime entered, so feeds it
    /// activates are spawned there.
    fn with_session<T>(&self, f: impl FnOnce(&mut LiveMapSession) -> T) -> T {
        let _guard = self.runtime.enter();
        f(&mut *self.lock())
    }

    async fn acquire_location(&self, keep_existing: bool) -> Result<LocationRecord, MapError> {
        let session = Arc::clone(&self.session);
        let task = self.runtime.spawn(async move {
            let source = {
                let session = session.lock().unwrap_or_else(PoisonError::into_inner);
                if keep_existing {
                    if let Some(fix) = session.location_fix() {
                        return fix.clone();
                    }
                }
                session.location_source()
            };

            let fix = source.acquire().await;
            session
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .apply_location(fix.clone());
            fix
        });

        let fix = task.await.map_err(|e| MapError::Runtime(e.to_string()))?;
        Ok(LocationRecord::from(&fix))
    }
}

#[uniffi::export]
impl LiveMap {
    #[uniffi::constructor]
    pub fn new(
        config_json: String,
        location: Arc<dyn DeviceLocation>,
    ) -> Result<Arc<Self>, MapError> {
        setup_logging();
        build(&config_json, location)
            .map(Arc::new)
            .map_err(|e| MapError::Setup(format!("{e:#}")))
    }

    /// Locate the user and load what is around them. Calling it again
    /// returns the first fix.
    pub async fn start(&self) -> Result<LocationRecord, MapError> {
        self.acquire_location(true).await
    }

    /// Ask the device for a new fix and re-centre on it.
    pub async fn locate(&self) -> Result<LocationRecord, MapError> {
        self.acquire_location(false).await
    }

    /// Debounced stop search. A [`SearchOutcomeRecord::Superseded`] answer
    /// should be ignored.
    pub async fn search(&self, query: String) -> Result<SearchOutcomeRecord, MapError> {
        let around = self.lock().location_fix().map(|fix| fix.position());
        let search = Arc::clone(&self.search);
        let outcome = self
            .runtime
            .spawn(async move { search.search(&query, around).await })
            .await
            .map_err(|e| MapError::Runtime(e.to_string()))?;
        Ok(outcome.into())
    }

    /// Open the bus list of a stop shown in the stops panel.
    pub fn select_stop(&self, stop_id: String) -> Result<(), MapError> {
        self.with_session(|session| {
            let stop = session
                .find_stop(&StopIdentifier::new(&stop_id))
                .ok_or(MapError::NotFound(stop_id))?;
            session.select_stop(stop);
            Ok(())
        })
    }

    /// Jump from any level to the bus list of a stop from the last search.
    pub fn select_search_result(&self, stop_id: String) -> Result<(), MapError> {
        let id = StopIdentifier::new(&stop_id);
        let stop = self
            .search
            .last_results()
            .into_iter()
            .map(|result| result.stop)
            .find(|stop| stop.id == id)
            .ok_or(MapError::NotFound(stop_id))?;
        self.with_session(|session| {
            session.select_search_result(stop);
        });
        Ok(())
    }

    pub fn select_bus(&self, bus_id: String) -> Result<(), MapError> {
        self.with_session(|session| {
            let bus = session
                .find_bus(&VehicleIdentifier::new(&bus_id))
                .ok_or(MapError::NotFound(bus_id))?;
            session.select_bus(bus)?;
            Ok(())
        })
    }

    pub fn back(&self) -> Result<(), MapError> {
        self.with_session(|session| session.back().map(drop).map_err(MapError::from))
    }

    pub fn refresh(&self) {
        self.with_session(LiveMapSession::refresh);
    }

    pub fn snapshot(&self) -> SnapshotRecord {
        SnapshotRecord::from(&self.lock().snapshot())
    }

    pub fn markers(&self) -> Vec<MarkerRecord> {
        self.lock().markers().iter().map(MarkerRecord::from).collect()
    }

    /// Camera moves the map should perform, oldest first
    pub fn take_camera_moves(&self) -> Vec<CameraMoveRecord> {
        self.lock()
            .take_camera_moves()
            .into_iter()
            .map(CameraMoveRecord::from)
            .collect()
    }

    /// GeoJSON of the tracked route, if one is loaded
    pub fn route_geojson(&self) -> Result<Option<String>, MapError> {
        let Some(route) = self.lock().route() else {
            return Ok(None);
        };
        serde_json::to_string(&route.to_geojson())
            .map(Some)
            .map_err(|e| MapError::Runtime(e.to_string()))
    }
}

#[uniffi::export]
pub fn route_color(route: String) -> String {
    transight_core::route_color(&RouteIdentifier::new(route))
}

#[cfg(test)]
mod tests {
    use super::location::LocationError;
    use super::records::{GeoPoint, StopsPanelRecord, ViewRecord};
    use super::*;

    struct NoLocation;

    impl DeviceLocation for NoLocation {
        fn current_position(&self) -> Result<GeoPoint, LocationError> {
            Err(LocationError::Unavailable)
        }
    }

    fn map() -> Arc<LiveMap> {
        let config = r#"{ "backend_url": "http://127.0.0.1:9", "location_timeout_ms": 50 }"#;
        LiveMap::new(config.to_owned(), Arc::new(NoLocation)).unwrap()
    }

    #[test]
    fn bad_config_is_a_setup_error() {
        let error = LiveMap::new("{".to_owned(), Arc::new(NoLocation)).unwrap_err();
        assert!(matches!(error, MapError::Setup(_)));
    }

    #[test]
    fn snapshot_before_start_is_locating() {
        let snapshot = map().snapshot();
        assert_eq!(snapshot.view, ViewRecord::Stops);
        assert_eq!(snapshot.stops, StopsPanelRecord::Locating);
        assert!(snapshot.location.is_none());
    }

    #[test]
    fn start_falls_back_when_device_has_no_fix() {
        let map = map();
        let handle = map.runtime.handle().clone();
        let first = handle.block_on(map.start()).unwrap();
        assert!(first.is_fallback);

        let again = handle.block_on(map.start()).unwrap();
        assert_eq!(again, first);

        let moves = map.take_camera_moves();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].target, first.position);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let map = map();
        assert!(matches!(
            map.select_stop("nope".into()),
            Err(MapError::NotFound(id)) if id == "nope"
        ));
        assert!(matches!(
            map.select_search_result("nope".into()),
            Err(MapError::NotFound(_))
        ));
        assert!(matches!(map.back(), Err(MapError::Navigation(_))));
    }

    #[test]
    fn route_colors_are_hex() {
        let color = route_color("72".into());
        assert_eq!(color.len(), 7);
        assert!(color.starts_with('#'));
    }
}
