use crate::geocode::Coordinates;
use crate::identity::encode_component;
use crate::listings::error::{ListingsError, ListingsResult};
use crate::listings::format::{self, facts_line, money, number};
use crate::listings::model::{Fee, Listing};

pub const NOT_FOUND_TITLE: &str = "Listing not found";
pub const NOT_FOUND_SUBTITLE: &str = "Try going back to results.";
pub const NO_DESCRIPTION: &str = "No description provided yet.";
pub const PHOTO_UNAVAILABLE: &str = "Photo unavailable";
pub const DEFAULT_PAGE_TITLE: &str = "VerityBridge Listing";
const EM_DASH: &str = "\u{2014}";
const PLACEHOLDER_CAPTION_LIMIT: usize = 60;
const TOUR_MESSAGE: &str =
    "Hi! I\u{2019}m interested in this property. Is it available for a tour this week?";

/// Reads the listing id from a detail page query string (`?id=l-1`).
pub fn listing_id_from_query(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.trim().to_string())
        .filter(|id| !id.is_empty())
}

/// Inline SVG image with a caption, shown when a listing has no photos.
pub fn placeholder_photo(caption: &str) -> String {
    let caption = if caption.is_empty() {
        PHOTO_UNAVAILABLE
    } else {
        caption
    };
    let caption: String = caption.chars().take(PLACEHOLDER_CAPTION_LIMIT).collect();
    let svg = format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="1200" height="700">"#,
            r##"<rect width="100%" height="100%" fill="#eef2f7"/>"##,
            r#"<text x="50%" y="55%" dominant-baseline="middle" text-anchor="middle""#,
            r##" font-family="Arial" font-size="44" fill="#6b7280">{}</text></svg>"##
        ),
        format::escape_html(&caption)
    );
    format!("data:image/svg+xml;charset=utf-8,{}", encode_component(&svg))
}

/// Hero photo cursor for the detail page gallery.
///
/// Moving before the first photo selects the last one and moving past the last
/// selects the first. A listing without usable photos gets a single
/// placeholder image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gallery {
    photos: Vec<String>,
    active: usize,
    placeholder: bool,
}

impl Gallery {
    pub fn new(photos: impl IntoIterator<Item = String>) -> Self {
        let photos: Vec<String> = photos
            .into_iter()
            .filter(|photo| !photo.trim().is_empty())
            .collect();
        if photos.is_empty() {
            return Self {
                photos: vec![placeholder_photo(PHOTO_UNAVAILABLE)],
                active: 0,
                placeholder: true,
            };
        }
        Self {
            photos,
            active: 0,
            placeholder: false,
        }
    }

    pub fn for_listing(listing: &Listing) -> Self {
        Self::new(listing.photos.iter().cloned())
    }

    pub fn photos(&self) -> &[String] {
        &self.photos
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn hero(&self) -> &str {
        &self.photos[self.active]
    }

    /// Selects `index`, wrapping out-of-range values to the opposite end.
    pub fn select(&mut self, index: isize) -> &str {
        let last = self.photos.len() - 1;
        self.active = if index < 0 {
            last
        } else if index as usize > last {
            0
        } else {
            index as usize
        };
        self.hero()
    }

    pub fn next(&mut self) -> &str {
        self.select(self.active as isize + 1)
    }

    pub fn previous(&mut self) -> &str {
        self.select(self.active as isize - 1)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverviewTile {
    pub label: &'static str,
    pub value: String,
}

impl OverviewTile {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }

    /// `<div class="info-tile">` markup with escaped label and value.
    pub fn to_html(&self) -> String {
        format!(
            r#"<div class="info-tile"><div class="info-label">{}</div><div class="info-value">{}</div></div>"#,
            format::escape_html(self.label),
            format::escape_html(&self.value)
        )
    }
}

/// Message copied to the clipboard before the buyer emails the seller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TourRequest {
    pub seller_email: String,
    pub message: String,
}

impl TourRequest {
    /// Bare `mailto:` link; the message travels through the clipboard.
    pub fn mailto_href(&self) -> String {
        format!("mailto:{}", self.seller_email)
    }
}

/// What the detail page shows for a looked-up id.
#[derive(Clone, Debug, PartialEq)]
pub enum DetailPage<'a> {
    NotFound,
    Found(ListingDetail<'a>),
}

impl<'a> DetailPage<'a> {
    pub fn from_lookup(listing: Option<&'a Listing>) -> Self {
        match listing {
            Some(listing) => DetailPage::Found(ListingDetail::new(listing)),
            None => DetailPage::NotFound,
        }
    }

    pub fn title(&self) -> String {
        match self {
            DetailPage::NotFound => NOT_FOUND_TITLE.to_string(),
            DetailPage::Found(detail) => detail.title().to_string(),
        }
    }

    pub fn subtitle(&self) -> String {
        match self {
            DetailPage::NotFound => NOT_FOUND_SUBTITLE.to_string(),
            DetailPage::Found(detail) => detail.subtitle(),
        }
    }

    /// The map card is hidden for unknown listings and listings without
    /// coordinates.
    pub fn map_center(&self) -> Option<Coordinates> {
        match self {
            DetailPage::NotFound => None,
            DetailPage::Found(detail) => detail.map_center(),
        }
    }
}

/// Display values for one listing's detail page.
#[derive(Clone, Debug, PartialEq)]
pub struct ListingDetail<'a> {
    listing: &'a Listing,
}

impl<'a> ListingDetail<'a> {
    pub fn new(listing: &'a Listing) -> Self {
        Self { listing }
    }

    pub fn listing(&self) -> &'a Listing {
        self.listing
    }

    pub fn title(&self) -> &'a str {
        &self.listing.address
    }

    /// `city, state zip • neighborhood`. The separator is dropped when there
    /// is no neighborhood.
    pub fn subtitle(&self) -> String {
        let location = self.location_line();
        let neighborhood = self.listing.neighborhood.trim();
        if neighborhood.is_empty() {
            location
        } else {
            format!("{location} • {neighborhood}")
        }
    }

    /// `city, state zip`, also used in the map popup.
    pub fn location_line(&self) -> String {
        let listing = self.listing;
        format!("{}, {} {}", listing.city, listing.state, listing.zip)
            .trim()
            .to_string()
    }

    pub fn price(&self) -> String {
        money(self.listing.price)
    }

    pub fn facts(&self) -> String {
        facts_line(self.listing)
    }

    pub fn description(&self) -> &'a str {
        let description = self.listing.description.trim();
        if description.is_empty() {
            NO_DESCRIPTION
        } else {
            description
        }
    }

    pub fn overview(&self) -> Vec<OverviewTile> {
        let listing = self.listing;
        let lot = match listing.lot_sqft {
            Some(lot) if lot > 0.0 => format!("{} sqft", number(lot)),
            _ => EM_DASH.to_string(),
        };
        let year_built = if listing.year_built > 0.0 {
            format!("{}", listing.year_built.trunc() as i64)
        } else {
            EM_DASH.to_string()
        };
        vec![
            OverviewTile::new("Type", or_dash(&listing.property_type)),
            OverviewTile::new("Year built", year_built),
            OverviewTile::new("Lot", lot),
            OverviewTile::new("Parking", or_dash(&listing.parking)),
            OverviewTile::new("HOA", fee_display(listing.hoa.as_ref())),
            OverviewTile::new("Taxes", fee_display(listing.taxes.as_ref())),
        ]
    }

    pub fn gallery(&self) -> Gallery {
        Gallery::for_listing(self.listing)
    }

    pub fn map_center(&self) -> Option<Coordinates> {
        self.listing.coordinates()
    }

    pub fn video_tour_href(&self) -> String {
        format::video_tour_href(&self.listing.id)
    }

    pub fn save_label(&self, saved: bool) -> &'static str {
        if saved {
            "❤️ Saved"
        } else {
            "♡ Save"
        }
    }

    /// Builds the tour request for the seller.
    ///
    /// Fails with [`ListingsError::Validation`] when the listing has no seller
    /// email. The buyer email line is left out for anonymous visitors.
    pub fn tour_request(
        &self,
        page_title: &str,
        buyer_email: Option<&str>,
    ) -> ListingsResult<TourRequest> {
        let seller_email = self.listing.seller_email.trim();
        if seller_email.is_empty() {
            return Err(ListingsError::Validation(
                "Seller email isn\u{2019}t available for this listing yet.".to_string(),
            ));
        }
        let listing = self.listing;
        let page_title = match page_title.trim() {
            "" => DEFAULT_PAGE_TITLE,
            title => title,
        };
        let mut message = format!(
            "Tour request (VerityBridge)\n\nListing: {page_title}\nAddress: {}, {}, {} {}\n",
            listing.address, listing.city, listing.state, listing.zip
        );
        if let Some(buyer) = buyer_email.map(str::trim).filter(|email| !email.is_empty()) {
            message.push_str(&format!("Buyer email: {buyer}\n"));
        }
        message.push_str(&format!("\nMessage:\n{TOUR_MESSAGE}\n"));
        Ok(TourRequest {
            seller_email: seller_email.to_string(),
            message,
        })
    }
}

fn or_dash(value: &str) -> String {
    match value.trim() {
        "" => EM_DASH.to_string(),
        value => value.to_string(),
    }
}

fn fee_display(fee: Option<&Fee>) -> String {
    match fee {
        Some(Fee::Amount(amount)) => money(*amount),
        Some(Fee::Text(text)) => or_dash(text),
        None => EM_DASH.to_string(),
    }
}
