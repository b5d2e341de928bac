use std::cmp::Ordering;
use std::str::FromStr;

use crate::listings::model::{Listing, ListingMode};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Source order (newest first in the catalog and the collection).
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    SqftDesc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::PriceAsc => "price_asc",
            SortOrder::PriceDesc => "price_desc",
            SortOrder::SqftDesc => "sqft_desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = std::convert::Infallible;

    /// Unknown values sort by source order.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(match raw.trim() {
            "price_asc" => SortOrder::PriceAsc,
            "price_desc" => SortOrder::PriceDesc,
            "sqft_desc" => SortOrder::SqftDesc,
            _ => SortOrder::Newest,
        })
    }
}

/// Results page filters. Zero bounds and empty strings mean "any".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchCriteria {
    pub mode: ListingMode,
    pub query: String,
    pub min_price: f64,
    pub max_price: f64,
    pub min_beds: f64,
    pub property_type: String,
    pub sort: SortOrder,
}

impl SearchCriteria {
    pub fn for_mode(mode: ListingMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Reads `mode`, `q`, `minPrice`, `maxPrice`, `minBeds`, `type` and `sort`
    /// from a results page query string.
    pub fn from_query(query: &str) -> Self {
        let mut criteria = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            let value = value.trim();
            match key.as_ref() {
                "mode" => criteria.mode = ListingMode::parse(value),
                "q" => criteria.query = value.to_string(),
                "minPrice" => criteria.min_price = parse_bound(value),
                "maxPrice" => criteria.max_price = parse_bound(value),
                "minBeds" => criteria.min_beds = parse_bound(value),
                "type" => criteria.property_type = value.to_string(),
                "sort" => criteria.sort = value.parse().unwrap_or_default(),
                _ => {}
            }
        }
        criteria
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        listing.listing_mode() == self.mode
            && self.matches_text(listing)
            && self.passes_bounds(listing)
    }

    fn matches_text(&self, listing: &Listing) -> bool {
        let query = self.query.trim();
        if query.is_empty() {
            return true;
        }
        let haystack = format!(
            "{} {} {} {}",
            listing.address, listing.city, listing.state, listing.zip
        )
        .to_lowercase();
        haystack.contains(&query.to_lowercase())
    }

    fn passes_bounds(&self, listing: &Listing) -> bool {
        if self.min_price > 0.0 && listing.price < self.min_price {
            return false;
        }
        if self.max_price > 0.0 && listing.price > self.max_price {
            return false;
        }
        if self.min_beds > 0.0 && listing.beds < self.min_beds {
            return false;
        }
        self.property_type.is_empty() || listing.property_type == self.property_type
    }
}

fn parse_bound(raw: &str) -> f64 {
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
        .unwrap_or(0.0)
}

/// Filters `listings` by `criteria` and orders the matches.
///
/// Sorting is stable, so ties keep their source order.
pub fn search<'a>(listings: &'a [Listing], criteria: &SearchCriteria) -> Vec<&'a Listing> {
    let mut matches: Vec<&Listing> = listings
        .iter()
        .filter(|listing| criteria.matches(listing))
        .collect();

    match criteria.sort {
        SortOrder::Newest => {}
        SortOrder::PriceAsc => matches.sort_by(|a, b| compare(a.price, b.price)),
        SortOrder::PriceDesc => matches.sort_by(|a, b| compare(b.price, a.price)),
        SortOrder::SqftDesc => matches.sort_by(|a, b| compare(b.sqft, a.sqft)),
    }
    matches
}

fn compare(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: &str, mode: &str, city: &str, price: f64, beds: f64, sqft: f64) -> Listing {
        Listing {
            id: id.into(),
            mode: mode.into(),
            address: format!("{id} Main St"),
            city: city.into(),
            state: "TX".into(),
            price,
            beds,
            sqft,
            property_type: "House".into(),
            ..Listing::default()
        }
    }

    fn ids(results: Vec<&Listing>) -> Vec<&str> {
        results.into_iter().map(|l| l.id.as_str()).collect()
    }

    fn sample() -> Vec<Listing> {
        vec![
            listing("a", "buy", "Austin", 500_000.0, 3.0, 1800.0),
            listing("b", "rent", "Austin", 2_000.0, 2.0, 900.0),
            listing("c", "", "Dallas", 350_000.0, 2.0, 2400.0),
            listing("d", "buy", "Austin", 350_000.0, 4.0, 2100.0),
        ]
    }

    #[test]
    fn filters_by_mode_text_and_bounds() {
        let listings = sample();
        let mut criteria = SearchCriteria::for_mode(ListingMode::Buy);
        assert_eq!(ids(search(&listings, &criteria)), vec!["a", "c", "d"]);

        criteria.query = "austin".into();
        assert_eq!(ids(search(&listings, &criteria)), vec!["a", "d"]);

        criteria.max_price = 400_000.0;
        criteria.min_beds = 3.0;
        assert_eq!(ids(search(&listings, &criteria)), vec!["d"]);

        criteria.property_type = "Condo".into();
        assert!(search(&listings, &criteria).is_empty());

        let rent = SearchCriteria::for_mode(ListingMode::Rent);
        assert_eq!(ids(search(&listings, &rent)), vec!["b"]);
    }

    #[test]
    fn sorts_stably() {
        let listings = sample();
        let mut criteria = SearchCriteria::for_mode(ListingMode::Buy);

        criteria.sort = SortOrder::PriceAsc;
        assert_eq!(ids(search(&listings, &criteria)), vec!["c", "d", "a"]);

        criteria.sort = SortOrder::PriceDesc;
        assert_eq!(ids(search(&listings, &criteria)), vec!["a", "c", "d"]);

        criteria.sort = SortOrder::SqftDesc;
        assert_eq!(ids(search(&listings, &criteria)), vec!["c", "d", "a"]);
    }

    #[test]
    fn reads_results_page_query() {
        let criteria =
            SearchCriteria::from_query("?mode=RENT&q=+Austin+&minPrice=1000&maxPrice=abc&sort=bogus&type=Condo");
        assert_eq!(criteria.mode, ListingMode::Rent);
        assert_eq!(criteria.query, "Austin");
        assert_eq!(criteria.min_price, 1000.0);
        assert_eq!(criteria.max_price, 0.0);
        assert_eq!(criteria.sort, SortOrder::Newest);
        assert_eq!(criteria.property_type, "Condo");
        assert_eq!(SearchCriteria::from_query(""), SearchCriteria::default());
    }
}
