use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use transight_transit::{DataFetcher, Result, TransitError};

/// [`DataFetcher`] over HTTP(S)
#[derive(Clone, Debug)]
pub struct ReqwestFetcher {
    http: Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("transight/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(network)?;
        Ok(Self { http })
    }
}

fn network(error: reqwest::Error) -> TransitError {
    TransitError::Network(error.to_string())
}

impl DataFetcher for ReqwestFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>> {
        Box::pin(async move {
            let response = self.http.get(url).send().await.map_err(network)?;

            if response.status() == StatusCode::NOT_FOUND {
                return Err(TransitError::NotFound(url.to_string()));
            }
            let response = response.error_for_status().map_err(network)?;
            let body = response.bytes().await.map_err(network)?;
            Ok(body.to_vec())
        })
    }
}
