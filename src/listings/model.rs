use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::geocode::Coordinates;
use crate::identity::encode_component;

pub const LISTING_PAGE: &str = "listing.html";

/// A property listing as stored in the `listings` collection or the bundled
/// `data/listings.json` catalog.
///
/// Decoding is forgiving: numbers may arrive as strings, missing numbers read
/// as zero and coordinates are kept only when they are real JSON numbers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Listing {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(
        deserialize_with = "lenient_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub owner_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(deserialize_with = "lenient_string")]
    pub mode: String,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub address: String,
    #[serde(deserialize_with = "lenient_string")]
    pub city: String,
    #[serde(deserialize_with = "lenient_string")]
    pub state: String,
    #[serde(deserialize_with = "lenient_string")]
    pub zip: String,
    #[serde(deserialize_with = "lenient_string")]
    pub neighborhood: String,
    #[serde(deserialize_with = "lenient_number")]
    pub price: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub beds: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub baths: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub sqft: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub year_built: f64,
    #[serde(deserialize_with = "strict_number", skip_serializing_if = "Option::is_none")]
    pub lot_sqft: Option<f64>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "String::is_empty")]
    pub parking: String,
    #[serde(deserialize_with = "lenient_fee", skip_serializing_if = "Option::is_none")]
    pub hoa: Option<Fee>,
    #[serde(deserialize_with = "lenient_fee", skip_serializing_if = "Option::is_none")]
    pub taxes: Option<Fee>,
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub property_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "string_list")]
    pub photos: Vec<String>,
    #[serde(deserialize_with = "strict_number", skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(deserialize_with = "strict_number", skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(
        deserialize_with = "lenient_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<String>,
    /// Contact address for tour requests.
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "String::is_empty")]
    pub seller_email: String,
}

/// A recurring cost such as HOA dues or taxes. Records hold either an amount
/// or free text like `"Included"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fee {
    Amount(f64),
    Text(String),
}

impl Listing {
    pub fn listing_mode(&self) -> ListingMode {
        ListingMode::parse(&self.mode)
    }

    /// Map position, when both coordinates are present.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }

    pub fn is_owned_by(&self, uid: &str) -> bool {
        self.owner_id.as_deref() == Some(uid)
    }

    pub fn href(&self) -> String {
        listing_href(&self.id)
    }
}

/// `listing.html?id=<encoded id>`.
pub fn listing_href(id: &str) -> String {
    format!("{LISTING_PAGE}?id={}", encode_component(id))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ListingMode {
    #[default]
    Buy,
    Rent,
    Sell,
    Mortgage,
}

impl ListingMode {
    /// Case-insensitive; anything unrecognised is a sale listing.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rent" => ListingMode::Rent,
            "sell" => ListingMode::Sell,
            "mortgage" => ListingMode::Mortgage,
            _ => ListingMode::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ListingMode::Buy => "buy",
            ListingMode::Rent => "rent",
            ListingMode::Sell => "sell",
            ListingMode::Mortgage => "mortgage",
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            ListingMode::Buy => "Homes for sale",
            ListingMode::Rent => "Homes for rent",
            ListingMode::Sell => "Sell with confidence",
            ListingMode::Mortgage => "Mortgage guidance",
        }
    }

    /// Buy and rent pages show the search filters; sell and mortgage pages show
    /// a call-to-action panel instead.
    pub fn shows_filters(&self) -> bool {
        matches!(self, ListingMode::Buy | ListingMode::Rent)
    }

    /// Label of the price input on the listing form.
    pub fn price_label(&self) -> &'static str {
        match self {
            ListingMode::Rent => "Rent / month",
            ListingMode::Mortgage => "Est. payment / month",
            ListingMode::Buy | ListingMode::Sell => "Price",
        }
    }
}

impl fmt::Display for ListingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_optional_string(deserializer)?.unwrap_or_default())
}

fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(value) => Some(value),
        Value::Number(value) => Some(value.to_string()),
        Value::Bool(value) => Some(value.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = match Value::deserialize(deserializer)? {
        Value::Number(value) => value.as_f64().unwrap_or(0.0),
        Value::String(value) => value.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if number.is_finite() { number } else { 0.0 })
}

fn lenient_fee<'de, D>(deserializer: D) -> Result<Option<Fee>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(value) => value.as_f64().filter(|v| v.is_finite()).map(Fee::Amount),
        Value::String(value) => Some(Fee::Text(value)),
        Value::Bool(value) => Some(Fee::Text(value.to_string())),
        _ => None,
    })
}

fn strict_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(value) => value.as_f64(),
        _ => None,
    })
}

fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(values) => values
            .into_iter()
            .filter_map(|value| match value {
                Value::String(value) if !value.is_empty() => Some(value),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}
