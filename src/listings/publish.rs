use std::sync::{Arc, LazyLock};

use crate::geocode::{Coordinates, Geocoder};
use crate::identity::IdentityStream;
use crate::listings::draft::{generate_listing_id, ListingDraft};
use crate::listings::error::{ListingsError, ListingsResult};
use crate::listings::model::Listing;
use crate::listings::store::ListingStore;
use crate::logger::Logger;

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@veritybridge/listings"));

#[derive(Clone, Debug, PartialEq)]
pub struct PublishedListing {
    pub listing: Listing,
    /// Detail page of the new listing.
    pub href: String,
}

/// Publishes listings submitted through the "sell" form.
pub struct ListingPublisher {
    identity: Arc<dyn IdentityStream>,
    store: Arc<dyn ListingStore>,
    geocoder: Option<Arc<dyn Geocoder>>,
}

impl ListingPublisher {
    pub fn new(identity: Arc<dyn IdentityStream>, store: Arc<dyn ListingStore>) -> Self {
        Self {
            identity,
            store,
            geocoder: None,
        }
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// Stores `draft` as a new active listing owned by the signed-in principal.
    ///
    /// Geocoding is best effort; when it fails the listing is stored without
    /// coordinates.
    pub async fn publish(&self, draft: ListingDraft) -> ListingsResult<PublishedListing> {
        let Some(principal) = self.identity.current() else {
            return Err(ListingsError::NotAuthenticated);
        };
        draft.validate()?;

        let coordinates = self.locate(&draft.full_address()).await;
        let listing = draft.into_listing(principal.uid(), generate_listing_id(), coordinates)?;

        LOGGER.info(format!("publishing listing {}", listing.id));
        self.store.put(listing.clone()).await.map_err(|err| {
            LOGGER.error(format!("publish of {} failed: {err}", listing.id));
            ListingsError::Store(err)
        })?;

        let href = listing.href();
        Ok(PublishedListing { listing, href })
    }

    async fn locate(&self, address: &str) -> Option<Coordinates> {
        let geocoder = self.geocoder.as_ref()?;
        if address.is_empty() {
            return None;
        }
        match geocoder.geocode(address).await {
            Ok(Some(coordinates)) => Some(coordinates),
            Ok(None) => {
                LOGGER.info(format!("no coordinates found for {address:?}"));
                None
            }
            Err(err) => {
                LOGGER.warn(format!("geocoding {address:?} failed: {err}"));
                None
            }
        }
    }
}
