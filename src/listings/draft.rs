use chrono::{SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geocode::Coordinates;
use crate::listings::error::{ListingsError, ListingsResult};
use crate::listings::model::{Listing, ListingMode};

pub const MAX_PHOTOS: usize = 8;
pub const ACTIVE_STATUS: &str = "active";

/// Values submitted through the "sell" form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingDraft {
    pub mode: String,
    pub title: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub price: f64,
    pub beds: f64,
    pub baths: f64,
    pub sqft: f64,
    pub year_built: f64,
    #[serde(rename = "type")]
    pub property_type: String,
    pub description: String,
    /// Raw textarea contents, one URL per line.
    pub photo_urls: String,
}

impl ListingDraft {
    pub fn listing_mode(&self) -> ListingMode {
        ListingMode::parse(&self.mode)
    }

    pub fn price_label(&self) -> &'static str {
        self.listing_mode().price_label()
    }

    pub fn photos(&self) -> Vec<String> {
        parse_photo_urls(&self.photo_urls)
    }

    /// Address line handed to the geocoder.
    pub fn full_address(&self) -> String {
        let state_zip = [self.state.trim(), self.zip.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        [self.address.trim(), self.city.trim(), state_zip.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Checks the draft can be published and returns its photos.
    pub fn validate(&self) -> ListingsResult<Vec<String>> {
        let photos = self.photos();
        if photos.is_empty() {
            return Err(ListingsError::Validation(
                "Please paste at least 1 photo URL.".to_string(),
            ));
        }
        Ok(photos)
    }

    pub fn into_listing(
        self,
        owner_id: &str,
        id: impl Into<String>,
        coordinates: Option<Coordinates>,
    ) -> ListingsResult<Listing> {
        let photos = self.validate()?;
        let mode = self.listing_mode();
        Ok(Listing {
            id: id.into(),
            owner_id: Some(owner_id.to_string()),
            status: ACTIVE_STATUS.to_string(),
            mode: mode.as_str().to_string(),
            title: self.title.trim().to_string(),
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            zip: self.zip.trim().to_string(),
            price: sanitize(self.price),
            beds: sanitize(self.beds),
            baths: sanitize(self.baths),
            sqft: sanitize(self.sqft),
            year_built: sanitize(self.year_built),
            property_type: self.property_type.trim().to_string(),
            description: self.description.trim().to_string(),
            photos,
            lat: coordinates.map(|c| c.lat),
            lng: coordinates.map(|c| c.lng),
            created_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            ..Listing::default()
        })
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Splits the photo textarea into at most [`MAX_PHOTOS`] http(s) URLs.
pub fn parse_photo_urls(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|url| url.starts_with("http://") || url.starts_with("https://"))
        .take(MAX_PHOTOS)
        .map(str::to_string)
        .collect()
}

/// `l-<unix millis>-<0..100000>`.
pub fn generate_listing_id() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..100_000);
    format!("l-{}-{suffix}", Utc::now().timestamp_millis())
}
