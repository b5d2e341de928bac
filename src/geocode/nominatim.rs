#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::{MarketplaceConfig, DEFAULT_GEOCODER_ENDPOINT};
use crate::geocode::api::{Coordinates, Geocoder};
use crate::geocode::error::{GeocodeError, GeocodeResult};

#[cfg(not(target_arch = "wasm32"))]
const USER_AGENT: &str = concat!("veritybridge/", env!("CARGO_PKG_VERSION"));
#[cfg(not(target_arch = "wasm32"))]
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// [`Geocoder`] backed by an OpenStreetMap Nominatim search endpoint.
#[derive(Clone, Debug)]
pub struct NominatimGeocoder {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new(DEFAULT_GEOCODER_ENDPOINT)
    }
}

impl NominatimGeocoder {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self { client, endpoint }
    }

    pub fn from_config(config: &MarketplaceConfig) -> Self {
        Self::new(config.geocoder_endpoint.clone())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> GeocodeResult<Option<Coordinates>> {
        let address = address.trim();
        if address.is_empty() {
            return Err(GeocodeError::InvalidArgument(
                "address must be non-empty".to_string(),
            ));
        }

        let url = format!("{}/search", self.endpoint);
        let mut request = self
            .client
            .get(url)
            .query(&[("format", "json"), ("limit", "1"), ("q", address)]);
        #[cfg(not(target_arch = "wasm32"))]
        {
            request = request
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .timeout(REQUEST_TIMEOUT);
        }

        let response = request
            .send()
            .await
            .map_err(|err| GeocodeError::Network(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("").to_string());
            return Err(GeocodeError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let hits: Vec<SearchHit> = response
            .json()
            .await
            .map_err(|err| GeocodeError::Parse(err.to_string()))?;
        let Some(hit) = hits.into_iter().next() else {
            log::debug!("no geocoding match for {address:?}");
            return Ok(None);
        };

        let lat = hit
            .lat
            .trim()
            .parse::<f64>()
            .map_err(|err| GeocodeError::Parse(format!("lat {:?}: {err}", hit.lat)))?;
        let lng = hit
            .lon
            .trim()
            .parse::<f64>()
            .map_err(|err| GeocodeError::Parse(format!("lon {:?}: {err}", hit.lon)))?;
        Ok(Some(Coordinates::new(lat, lng)))
    }
}
