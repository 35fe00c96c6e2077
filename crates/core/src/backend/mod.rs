//! The prediction service over HTTP.

mod fetcher;
mod wire;

use std::future::Future;
use std::pin::Pin;

use reqwest::Url;
use transight_transit::{
    DataFetcher, Position, Result, RouteGeometry, RouteIdentifier, SearchResult, Stop, StopBuses,
    StopIdentifier, TransitBackend, TransitError, Vehicle,
};

pub use fetcher::ReqwestFetcher;
use wire::{BusesResponse, RouteGeometryResponse, SearchResponse, StopsResponse, decode};

/// [`TransitBackend`] that talks JSON to the prediction service through any
/// [`DataFetcher`].
pub struct HttpBackend<F> {
    base: Url,
    fetcher: F,
}

impl<F: DataFetcher> HttpBackend<F> {
    pub fn new(base_url: &str, fetcher: F) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| TransitError::InvalidData(format!("backend url {base_url:?}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(TransitError::InvalidData(format!(
                "backend url {base_url:?} cannot carry a path"
            )));
        }
        Ok(Self { base, fetcher })
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url.into()
    }

    async fn get(&self, url: String) -> Result<Vec<u8>> {
        tracing::debug!(%url, "backend request");
        self.fetcher.fetch(&url).await
    }
}

fn position_query(around: Position) -> Vec<(&'static str, String)> {
    vec![
        ("lat", around.latitude.to_string()),
        ("lon", around.longitude.to_string()),
    ]
}

impl<F: DataFetcher> TransitBackend for HttpBackend<F> {
    fn nearby_stops<'a>(
        &'a self,
        around: Position,
        radius_km: f64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Stop>>> + Send + 'a>> {
        Box::pin(async move {
            let mut query = position_query(around);
            query.push(("radius", radius_km.to_string()));
            let body = self.get(self.endpoint(&["nearby-stops"], &query)).await?;
            Ok(decode::<StopsResponse>(&body)?.into_stops())
        })
    }

    fn stop_buses<'a>(
        &'a self,
        stop: &'a StopIdentifier,
        around: Position,
    ) -> Pin<Box<dyn Future<Output = Result<StopBuses>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.endpoint(&["stop", stop.as_str(), "buses"], &position_query(around));
            let body = self.get(url).await.map_err(|e| match e {
                TransitError::NotFound(_) => TransitError::StopNotFound(stop.clone()),
                other => other,
            })?;
            Ok(decode::<BusesResponse>(&body)?.into_stop_buses())
        })
    }

    fn route_geometry<'a>(
        &'a self,
        route: &'a RouteIdentifier,
    ) -> Pin<Box<dyn Future<Output = Result<RouteGeometry>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.endpoint(&["route", route.as_str(), "geometry"], &[]);
            let body = self.get(url).await.map_err(|e| route_not_found(e, route))?;
            Ok(decode::<RouteGeometryResponse>(&body)?.into_geometry(route.clone()))
        })
    }

    fn route_buses<'a>(
        &'a self,
        route: &'a RouteIdentifier,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vehicle>>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.endpoint(&["route", route.as_str(), "buses"], &[]);
            let body = self.get(url).await.map_err(|e| route_not_found(e, route))?;
            Ok(decode::<BusesResponse>(&body)?.into_vehicles())
        })
    }

    fn live_buses<'a>(
        &'a self,
        around: Position,
        radius_km: f64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vehicle>>> + Send + 'a>> {
        Box::pin(async move {
            let mut query = position_query(around);
            query.push(("radius", radius_km.to_string()));
            let body = self.get(self.endpoint(&["live-buses"], &query)).await?;
            Ok(decode::<BusesResponse>(&body)?.into_vehicles())
        })
    }

    fn search_stops<'a>(
        &'a self,
        query: &'a str,
        around: Option<Position>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SearchResult>>> + Send + 'a>> {
        Box::pin(async move {
            let mut params = vec![("q", query.to_string())];
            if let Some(around) = around {
                params.extend(position_query(around));
            }
            let body = self.get(self.endpoint(&["search-stops"], &params)).await?;
            Ok(decode::<SearchResponse>(&body)?.into_results())
        })
    }
}

fn route_not_found(error: TransitError, route: &RouteIdentifier) -> TransitError {
    match error {
        TransitError::NotFound(_) => TransitError::RouteNotFound(route.clone()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Serves canned bodies by path and records every URL asked for
    #[derive(Default)]
    struct CannedFetcher {
        bodies: HashMap<&'static str, &'static str>,
        requested: Mutex<Vec<String>>,
    }

    impl CannedFetcher {
        fn with(mut self, path: &'static str, body: &'static str) -> Self {
            self.bodies.insert(path, body);
            self
        }
    }

    impl DataFetcher for CannedFetcher {
        fn fetch<'a>(
            &'a self,
            url: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>> {
            self.requested.lock().unwrap().push(url.to_string());
            let path = Url::parse(url).unwrap().path().to_string();
            let body = self.bodies.get(path.as_str()).copied();
            Box::pin(async move {
                match body {
                    Some(body) => Ok(body.as_bytes().to_vec()),
                    None => Err(TransitError::NotFound(url.to_string())),
                }
            })
        }
    }

    fn backend(fetcher: CannedFetcher) -> HttpBackend<CannedFetcher> {
        HttpBackend::new("https://api.transight.test/v1/", fetcher).unwrap()
    }

    #[tokio::test]
    async fn nearby_stops_sends_location_and_radius() {
        let backend = backend(CannedFetcher::default().with(
            "/v1/nearby-stops",
            r#"{"stops": [{"id": "s1", "name": "Temple Meads", "lat": 51.4496, "lon": -2.5811}]}"#,
        ));

        let stops = backend.nearby_stops(Position::new(51.4545, -2.5879), 2.0).await.unwrap();
        assert_eq!(stops.len(), 1);

        let url = backend.fetcher.requested.lock().unwrap()[0].clone();
        assert_eq!(url, "https://api.transight.test/v1/nearby-stops?lat=51.4545&lon=-2.5879&radius=2");
    }

    #[tokio::test]
    async fn unknown_stop_maps_to_stop_not_found() {
        let backend = backend(CannedFetcher::default());
        let stop = StopIdentifier::new("0100BRP90312");

        let err = backend.stop_buses(&stop, Position::new(51.45, -2.58)).await.unwrap_err();
        assert_eq!(err, TransitError::StopNotFound(stop));
    }

    #[tokio::test]
    async fn path_segments_are_escaped() {
        let backend = backend(CannedFetcher::default().with("/v1/route/N%2F1/buses", r#"{"buses": []}"#));

        let buses = backend.route_buses(&RouteIdentifier::new("N/1")).await.unwrap();
        assert!(buses.is_empty());
    }

    #[tokio::test]
    async fn search_without_location_sends_query_only() {
        let backend = backend(CannedFetcher::default().with("/v1/search-stops", r#"{"results": []}"#));

        backend.search_stops("temple meads", None).await.unwrap();
        let url = backend.fetcher.requested.lock().unwrap()[0].clone();
        assert_eq!(url, "https://api.transight.test/v1/search-stops?q=temple+meads");
    }

    #[tokio::test]
    async fn route_geometry_is_decoded() {
        let backend = backend(CannedFetcher::default().with(
            "/v1/route/72/geometry",
            r#"{"path": [[51.4496, -2.5811], [51.4545, -2.5879]],
                "stops": [{"id": "s1", "name": "Temple Meads", "lat": 51.4496, "lon": -2.5811}]}"#,
        ));

        let geometry = backend.route_geometry(&RouteIdentifier::new("72")).await.unwrap();
        assert_eq!(geometry.stops.len(), 1);
        assert_eq!(geometry.to_geojson().features.len(), 2);
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(HttpBackend::new("not a url", CannedFetcher::default()).is_err());
        assert!(HttpBackend::new("mailto:someone@example.com", CannedFetcher::default()).is_err());
    }
}
