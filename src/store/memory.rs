use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::store::api::{RemoteSetStore, SetListenerRegistration, SetSnapshotCallback};
use crate::store::error::{invalid_argument, unavailable, StoreResult};

type HeldSnapshot = (SetSnapshotCallback, StoreResult<BTreeSet<String>>);

/// In-process [`RemoteSetStore`].
///
/// Listeners receive the current set on subscription and a fresh snapshot
/// after every mutation of their principal's set. Failures and snapshot
/// delivery can be controlled to reproduce network conditions in tests.
#[derive(Clone, Default)]
pub struct MemoryRemoteSetStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    sets: Mutex<HashMap<String, BTreeSet<String>>>,
    listeners: Mutex<BTreeMap<u64, MemoryListener>>,
    next_listener_id: AtomicU64,
    write_lock: Mutex<()>,
    fail_subscriptions: AtomicBool,
    fail_mutations: AtomicBool,
    hold_snapshots: AtomicBool,
    held: Mutex<Vec<HeldSnapshot>>,
}

#[derive(Clone)]
struct MemoryListener {
    principal_id: String,
    callback: SetSnapshotCallback,
}

impl MemoryRemoteSetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a principal's set and notifies its listeners.
    pub fn seed<I, S>(&self, principal_id: &str, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let _write = self.inner.write_lock.lock().unwrap();
        let items = items.into_iter().map(Into::into).collect();
        self.inner
            .sets
            .lock()
            .unwrap()
            .insert(principal_id.to_string(), items);
        self.inner.notify_principal(principal_id);
    }

    pub fn items(&self, principal_id: &str) -> BTreeSet<String> {
        self.inner.snapshot(principal_id)
    }

    /// Subscriptions report `Unavailable` through their callback while set.
    pub fn set_fail_subscriptions(&self, fail: bool) {
        self.inner.fail_subscriptions.store(fail, Ordering::SeqCst);
    }

    /// Inserts and removals fail with `Unavailable` while set.
    pub fn set_fail_mutations(&self, fail: bool) {
        self.inner.fail_mutations.store(fail, Ordering::SeqCst);
    }

    /// Queues snapshots instead of delivering them, as if they were still in flight.
    pub fn hold_snapshots(&self, hold: bool) {
        self.inner.hold_snapshots.store(hold, Ordering::SeqCst);
    }

    /// Delivers queued snapshots in order, including ones whose listener has
    /// since been detached. Returns how many were delivered.
    pub fn release_held_snapshots(&self) -> usize {
        let held: Vec<_> = self.inner.held.lock().unwrap().drain(..).collect();
        let count = held.len();
        for (callback, snapshot) in held {
            callback(snapshot);
        }
        count
    }

    pub fn listener_count(&self, principal_id: &str) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap()
            .values()
            .filter(|listener| listener.principal_id == principal_id)
            .count()
    }

    fn mutate<F>(&self, principal_id: &str, item_id: &str, apply: F) -> StoreResult<()>
    where
        F: FnOnce(&mut BTreeSet<String>, String),
    {
        if principal_id.is_empty() || item_id.is_empty() {
            return Err(invalid_argument("principal and item ids must be non-empty"));
        }
        if self.inner.fail_mutations.load(Ordering::SeqCst) {
            return Err(unavailable("favorites store is unreachable"));
        }
        let _write = self.inner.write_lock.lock().unwrap();
        {
            let mut sets = self.inner.sets.lock().unwrap();
            let set = sets.entry(principal_id.to_string()).or_default();
            apply(set, item_id.to_string());
        }
        self.inner.notify_principal(principal_id);
        Ok(())
    }
}

impl MemoryInner {
    fn snapshot(&self, principal_id: &str) -> BTreeSet<String> {
        self.sets
            .lock()
            .unwrap()
            .get(principal_id)
            .cloned()
            .unwrap_or_default()
    }

    fn deliver(&self, callback: SetSnapshotCallback, snapshot: StoreResult<BTreeSet<String>>) {
        if self.hold_snapshots.load(Ordering::SeqCst) {
            self.held.lock().unwrap().push((callback, snapshot));
        } else {
            callback(snapshot);
        }
    }

    fn notify_principal(&self, principal_id: &str) {
        let snapshot = self.snapshot(principal_id);
        let callbacks: Vec<_> = self
            .listeners
            .lock()
            .unwrap()
            .values()
            .filter(|listener| listener.principal_id == principal_id)
            .map(|listener| listener.callback.clone())
            .collect();
        for callback in callbacks {
            self.deliver(callback, Ok(snapshot.clone()));
        }
    }

    fn remove_listener(&self, id: u64) {
        self.listeners.lock().unwrap().remove(&id);
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl RemoteSetStore for MemoryRemoteSetStore {
    fn subscribe(
        &self,
        principal_id: &str,
        callback: SetSnapshotCallback,
    ) -> StoreResult<SetListenerRegistration> {
        if principal_id.is_empty() {
            return Err(invalid_argument("principal id must be non-empty"));
        }
        if self.inner.fail_subscriptions.load(Ordering::SeqCst) {
            self.inner
                .deliver(callback, Err(unavailable("favorites listener was rejected")));
            return Ok(SetListenerRegistration::new(|| {}));
        }

        let _write = self.inner.write_lock.lock().unwrap();
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.inner.listeners.lock().unwrap().insert(
            id,
            MemoryListener {
                principal_id: principal_id.to_string(),
                callback: callback.clone(),
            },
        );
        self.inner
            .deliver(callback, Ok(self.inner.snapshot(principal_id)));

        let inner = Arc::downgrade(&self.inner);
        Ok(SetListenerRegistration::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.remove_listener(id);
            }
        }))
    }

    async fn fetch(&self, principal_id: &str) -> StoreResult<BTreeSet<String>> {
        Ok(self.inner.snapshot(principal_id))
    }

    async fn insert(&self, principal_id: &str, item_id: &str) -> StoreResult<()> {
        self.mutate(principal_id, item_id, |set, item| {
            set.insert(item);
        })
    }

    async fn remove(&self, principal_id: &str, item_id: &str) -> StoreResult<()> {
        self.mutate(principal_id, item_id, |set, item| {
            set.remove(&item);
        })
    }
}
