use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::store::error::StoreResult;

/// Receives every snapshot of a principal's set, or the error that ended the
/// subscription attempt.
pub type SetSnapshotCallback = Arc<dyn Fn(StoreResult<BTreeSet<String>>) + Send + Sync + 'static>;

/// Per-principal set of item identifiers backed by a remote collection.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait RemoteSetStore: Send + Sync + 'static {
    /// Starts delivering snapshots of `principal_id`'s set to `callback`.
    ///
    /// The callback may be invoked before this method returns. Dropping or
    /// detaching the registration stops further deliveries.
    fn subscribe(
        &self,
        principal_id: &str,
        callback: SetSnapshotCallback,
    ) -> StoreResult<SetListenerRegistration>;

    async fn fetch(&self, principal_id: &str) -> StoreResult<BTreeSet<String>>;

    async fn insert(&self, principal_id: &str, item_id: &str) -> StoreResult<()>;

    async fn remove(&self, principal_id: &str, item_id: &str) -> StoreResult<()>;
}

/// RAII-style listener registration; dropping the handle cancels the
/// underlying subscription.
pub struct SetListenerRegistration {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl SetListenerRegistration {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn detach(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for SetListenerRegistration {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for SetListenerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetListenerRegistration")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
