//! Display helpers shared by the listing cards, the detail page and the
//! seller dashboard.

use crate::identity::encode_component;
use crate::listings::model::Listing;

pub const VIDEO_TOUR_HOST: &str = "https://meet.jit.si/";
const EM_DASH: &str = "\u{2014}";

/// Whole US dollars with thousands separators, e.g. `$1,250,000`.
pub fn money(amount: f64) -> String {
    let amount = if amount.is_finite() { amount.round() } else { 0.0 };
    let grouped = group_thousands(amount.abs() as u64);
    if amount < 0.0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// Grouped number with up to three decimals; zero renders as an em dash.
pub fn number(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return EM_DASH.to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let rounded = (value.abs() * 1000.0).round() / 1000.0;
    let whole = rounded.trunc();
    let fraction = format!("{:.3}", rounded - whole);
    let fraction = fraction
        .trim_start_matches('0')
        .trim_end_matches('0')
        .trim_end_matches('.');
    format!("{sign}{}{fraction}", group_thousands(whole as u64))
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// Plain rendering of a small count such as beds or baths (`3`, `2.5`).
fn plain(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// `1 home`, `3 homes`.
pub fn count_label(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

pub fn first_photo(listing: &Listing) -> Option<&str> {
    listing
        .photos
        .first()
        .map(String::as_str)
        .filter(|photo| !photo.is_empty())
}

pub fn video_room_for_listing(id: &str) -> String {
    format!("veritybridge-{id}")
}

pub fn video_tour_href(id: &str) -> String {
    format!("{VIDEO_TOUR_HOST}{}", encode_component(&video_room_for_listing(id)))
}

/// Card summary line, e.g. `3 bd • 2 ba • 1,850 sqft • House`.
pub fn facts_line(listing: &Listing) -> String {
    format!(
        "{} bd • {} ba • {} sqft • {}",
        plain(listing.beds),
        plain(listing.baths),
        number(listing.sqft),
        listing.property_type
    )
}
