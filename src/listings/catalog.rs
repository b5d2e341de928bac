use serde_json::Value;

use crate::listings::detail::DetailPage;
use crate::listings::error::ListingsResult;
use crate::listings::model::Listing;
use crate::listings::search::{search, SearchCriteria};

/// Listings loaded once per page, e.g. from `data/listings.json`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListingCatalog {
    listings: Vec<Listing>,
}

impl ListingCatalog {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self { listings }
    }

    /// Parses a catalog document. Anything other than a JSON array yields an
    /// empty catalog; array entries that are not objects are skipped.
    pub fn from_json_str(raw: &str) -> ListingsResult<Self> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Array(entries) = value else {
            log::warn!("listing catalog is not an array; treating it as empty");
            return Ok(Self::default());
        };

        let mut listings = Vec::with_capacity(entries.len());
        for entry in entries {
            if !entry.is_object() {
                log::debug!("skipping non-object catalog entry");
                continue;
            }
            listings.push(serde_json::from_value(entry)?);
        }
        Ok(Self { listings })
    }

    pub fn all(&self) -> &[Listing] {
        &self.listings
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Listing> {
        self.listings.iter().find(|listing| listing.id == id)
    }

    pub fn search(&self, criteria: &SearchCriteria) -> Vec<&Listing> {
        search(&self.listings, criteria)
    }

    /// Listings for the given favorite ids, in favorite order. Ids with no
    /// matching listing are dropped.
    pub fn favorites<S: AsRef<str>>(&self, ids: &[S]) -> Vec<&Listing> {
        ids.iter().filter_map(|id| self.get(id.as_ref())).collect()
    }

    /// Detail page for `id`; a missing id or unknown listing is not found.
    pub fn detail(&self, id: Option<&str>) -> DetailPage<'_> {
        DetailPage::from_lookup(id.and_then(|id| self.get(id)))
    }
}
