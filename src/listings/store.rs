use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_lock::RwLock;
use async_trait::async_trait;

use crate::listings::model::Listing;
use crate::store::{invalid_argument, unavailable, StoreResult};

/// The `listings` collection.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait ListingStore: Send + Sync + 'static {
    async fn list_all(&self) -> StoreResult<Vec<Listing>>;

    async fn list_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Listing>>;

    async fn get(&self, id: &str) -> StoreResult<Option<Listing>>;

    /// Creates or replaces the listing with `listing.id`.
    async fn put(&self, listing: Listing) -> StoreResult<()>;

    /// Deleting an unknown id succeeds.
    async fn delete(&self, id: &str) -> StoreResult<()>;
}

/// In-process [`ListingStore`] keeping insertion order.
#[derive(Clone, Default)]
pub struct MemoryListingStore {
    listings: Arc<RwLock<Vec<Listing>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listings(listings: Vec<Listing>) -> Self {
        Self {
            listings: Arc::new(RwLock::new(listings)),
            fail_writes: Arc::default(),
        }
    }

    /// Writes and deletes fail with `Unavailable` while set.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(unavailable("listings store is unreachable"))
        } else {
            Ok(())
        }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl ListingStore for MemoryListingStore {
    async fn list_all(&self) -> StoreResult<Vec<Listing>> {
        Ok(self.listings.read().await.clone())
    }

    async fn list_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Listing>> {
        Ok(self
            .listings
            .read()
            .await
            .iter()
            .filter(|listing| listing.is_owned_by(owner_id))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Listing>> {
        Ok(self
            .listings
            .read()
            .await
            .iter()
            .find(|listing| listing.id == id)
            .cloned())
    }

    async fn put(&self, listing: Listing) -> StoreResult<()> {
        if listing.id.is_empty() {
            return Err(invalid_argument("listing id must be non-empty"));
        }
        self.check_writable()?;
        let mut listings = self.listings.write().await;
        match listings.iter_mut().find(|existing| existing.id == listing.id) {
            Some(existing) => *existing = listing,
            None => listings.push(listing),
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.check_writable()?;
        self.listings.write().await.retain(|listing| listing.id != id);
        Ok(())
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::store::StoreErrorCode;

    fn listing(id: &str, owner: &str) -> Listing {
        Listing {
            id: id.into(),
            owner_id: Some(owner.into()),
            ..Listing::default()
        }
    }

    #[tokio::test]
    async fn put_replaces_and_filters_by_owner() {
        let store = MemoryListingStore::new();
        store.put(listing("l-1", "u1")).await.unwrap();
        store.put(listing("l-2", "u2")).await.unwrap();
        let mut updated = listing("l-1", "u1");
        updated.price = 10.0;
        store.put(updated).await.unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].price, 10.0);
        assert_eq!(store.list_by_owner("u2").await.unwrap()[0].id, "l-2");
        assert!(store.get("l-3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn writes_can_fail() {
        let store = MemoryListingStore::with_listings(vec![listing("l-1", "u1")]);
        store.set_fail_writes(true);
        let err = store.delete("l-1").await.unwrap_err();
        assert_eq!(err.code, StoreErrorCode::Unavailable);
        assert!(store.get("l-1").await.unwrap().is_some());

        store.set_fail_writes(false);
        store.delete("l-1").await.unwrap();
        store.delete("l-1").await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
