use std::sync::{Arc, LazyLock};

use crate::config::MarketplaceConfig;
use crate::identity::Principal;
use crate::listings::error::{ListingsError, ListingsResult};
use crate::listings::model::Listing;
use crate::listings::store::ListingStore;
use crate::logger::Logger;

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@veritybridge/my-listings"));

pub const MY_LISTINGS_PAGE: &str = "my_listings.html";

/// The seller dashboard: the principal's own listings, plus every listing for
/// the administrator.
pub struct MyListings {
    principal: Principal,
    is_admin: bool,
    store: Arc<dyn ListingStore>,
}

impl MyListings {
    /// Fails with [`ListingsError::NotAuthenticated`] for anonymous visitors.
    pub fn for_principal(
        principal: Option<Principal>,
        config: &MarketplaceConfig,
        store: Arc<dyn ListingStore>,
    ) -> ListingsResult<Self> {
        let principal = principal.ok_or(ListingsError::NotAuthenticated)?;
        let is_admin = config.is_admin_email(principal.email());
        Ok(Self {
            principal,
            is_admin,
            store,
        })
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub async fn load_mine(&self) -> ListingsResult<Vec<Listing>> {
        Ok(self.store.list_by_owner(self.principal.uid()).await?)
    }

    pub async fn load_all(&self) -> ListingsResult<Vec<Listing>> {
        if !self.is_admin {
            return Err(ListingsError::Forbidden(
                "only the administrator can list every listing".to_string(),
            ));
        }
        Ok(self.store.list_all().await?)
    }

    /// Deletes a listing the principal owns (any listing for the
    /// administrator) and returns the reloaded own listings.
    pub async fn delete(&self, listing_id: &str) -> ListingsResult<Vec<Listing>> {
        if let Some(listing) = self.store.get(listing_id).await? {
            if !self.is_admin && !listing.is_owned_by(self.principal.uid()) {
                return Err(ListingsError::Forbidden(format!(
                    "listing {listing_id} belongs to another seller"
                )));
            }
        }
        if let Err(err) = self.store.delete(listing_id).await {
            LOGGER.error(format!("delete of {listing_id} failed: {err}"));
            return Err(err.into());
        }
        LOGGER.info(format!("deleted listing {listing_id}"));
        self.load_mine().await
    }

    pub fn delete_label(&self, listing: &Listing) -> &'static str {
        match listing.owner_id.as_deref() {
            Some(owner) if self.is_admin && owner != self.principal.uid() => "Admin delete",
            _ => "Delete",
        }
    }
}
