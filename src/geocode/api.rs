use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::geocode::error::GeocodeResult;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Resolves a free-form street address to coordinates.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Geocoder: Send + Sync {
    /// Returns `Ok(None)` when the address is unknown to the service.
    async fn geocode(&self, address: &str) -> GeocodeResult<Option<Coordinates>>;
}
