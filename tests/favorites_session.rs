#![cfg(not(target_arch = "wasm32"))]

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;
use veritybridge::favorites::{FavoritesError, FavoritesSession, SessionState, ToggleOutcome};
use veritybridge::identity::{InMemoryIdentity, Navigator, Principal, RecordingNavigator};
use veritybridge::store::{
    unavailable, MemoryRemoteSetStore, RemoteSetStore, SetListenerRegistration,
    SetSnapshotCallback, StoreResult,
};

struct Harness {
    identity: Arc<InMemoryIdentity>,
    store: MemoryRemoteSetStore,
    navigator: Arc<RecordingNavigator>,
    session: Arc<FavoritesSession>,
}

fn harness(identity: InMemoryIdentity, store: MemoryRemoteSetStore) -> Harness {
    let identity = Arc::new(identity);
    let navigator = Arc::new(RecordingNavigator::new("/results.html?mode=buy"));
    let session = FavoritesSession::builder()
        .identity(identity.clone())
        .store(Arc::new(store.clone()))
        .navigator(navigator.clone() as Arc<dyn Navigator>)
        .build();
    session.start();
    Harness {
        identity,
        store,
        navigator,
        session,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn toggles_against_seeded_set() {
    let store = MemoryRemoteSetStore::new();
    store.seed("u1", ["a", "b"]);
    let h = harness(InMemoryIdentity::signed_in(Principal::new("u1")), store);
    h.session.wait_until_ready().await;

    assert!(h.session.has("a"));
    assert_eq!(
        h.session.toggle("a").await.unwrap(),
        ToggleOutcome { saved: false }
    );
    assert!(!h.session.has("a"));

    assert_eq!(
        h.session.toggle("c").await.unwrap(),
        ToggleOutcome { saved: true }
    );
    let items = h.session.read();
    assert!(items.contains(&"c".to_string()));
    assert!(items.contains(&"b".to_string()));
    assert!(!items.contains(&"a".to_string()));

    let remote = h.store.fetch("u1").await.unwrap();
    assert_eq!(remote.into_iter().collect::<Vec<_>>(), items);
    assert_eq!(h.session.fav_count_label(), "❤️ Favorites (2)");
}

#[tokio::test(flavor = "multi_thread")]
async fn anonymous_toggle_redirects_to_login() {
    let h = harness(InMemoryIdentity::new(), MemoryRemoteSetStore::new());
    h.session.wait_until_ready().await;

    let err = h.session.toggle("x").await.unwrap_err();
    assert_eq!(err, FavoritesError::NotAuthenticated);
    assert!(h.session.read().is_empty());
    assert_eq!(
        h.navigator.last_visit().as_deref(),
        Some("login.html?returnTo=results.html%3Fmode%3Dbuy")
    );
    assert!(!h.session.ensure_logged_in());
    assert_eq!(h.navigator.visits().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn late_snapshot_from_previous_principal_is_ignored() {
    let store = MemoryRemoteSetStore::new();
    store.seed("u1", ["u1-home"]);
    store.seed("u2", ["u2-home"]);
    store.hold_snapshots(true);
    let h = harness(InMemoryIdentity::signed_in(Principal::new("u1")), store);
    assert_eq!(h.session.state(), SessionState::AwaitingFirstSnapshot);

    h.identity.sign_in(Principal::new("u2"));
    assert_eq!(h.store.listener_count("u1"), 0);
    assert_eq!(h.store.listener_count("u2"), 1);

    h.store.hold_snapshots(false);
    assert_eq!(h.store.release_held_snapshots(), 2);
    h.session.wait_until_ready().await;

    assert_eq!(h.session.read(), vec!["u2-home".to_string()]);
    assert_eq!(h.session.principal().unwrap().uid, "u2");
}

#[tokio::test(flavor = "multi_thread")]
async fn double_toggle_restores_membership() {
    let store = MemoryRemoteSetStore::new();
    store.seed("u1", ["a"]);
    let h = harness(InMemoryIdentity::signed_in(Principal::new("u1")), store);
    h.session.wait_until_ready().await;

    for id in ["a", "z"] {
        let before = h.session.has(id);
        let first = h.session.toggle(id).await.unwrap();
        assert_eq!(first.saved, !before);
        assert_eq!(h.session.has(id), !before);
        let second = h.session.toggle(id).await.unwrap();
        assert_eq!(second.saved, before);
        assert_eq!(h.session.has(id), before);
    }
    assert_eq!(h.store.items("u1").len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_subscription_fails_open() {
    let store = MemoryRemoteSetStore::new();
    store.seed("u1", ["a"]);
    store.set_fail_subscriptions(true);
    let h = harness(InMemoryIdentity::signed_in(Principal::new("u1")), store);

    h.session.wait_until_ready().await;
    assert!(h.session.is_ready());
    assert!(h.session.is_logged_in());
    assert!(h.session.read().is_empty());
    assert_eq!(h.session.state(), SessionState::Ready);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_backend_resolves_ready_and_stays_unbound() {
    let identity = Arc::new(InMemoryIdentity::signed_in(Principal::new("u1")));
    let navigator = Arc::new(RecordingNavigator::new("/favorites.html"));
    let session = FavoritesSession::builder()
        .identity(identity.clone())
        .navigator(navigator.clone())
        .build();
    session.start();

    session.wait_until_ready().await;
    assert_eq!(session.state(), SessionState::Unbound);
    assert!(!session.is_logged_in());
    assert_eq!(identity.observer_count(), 0);
    assert_eq!(
        session.toggle("a").await.unwrap_err(),
        FavoritesError::NotAuthenticated
    );
    assert_eq!(
        navigator.last_visit().as_deref(),
        Some("login.html?returnTo=favorites.html")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn sign_out_empties_mirror_and_waiters_share_readiness() {
    let store = MemoryRemoteSetStore::new();
    store.seed("u1", ["a", "b"]);
    let h = harness(InMemoryIdentity::signed_in(Principal::new("u1")), store);

    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let session = h.session.clone();
            tokio::spawn(async move { session.wait_until_ready().await })
        })
        .collect();
    for waiter in waiters {
        waiter.await.unwrap();
    }
    assert_eq!(h.session.count(), 2);

    h.identity.sign_out();
    assert!(h.session.read().is_empty());
    assert!(!h.session.is_logged_in());
    assert_eq!(h.store.items("u1").len(), 2);
}

/// Store whose snapshots are pushed by the test and whose writes pause until
/// released, then fail.
#[derive(Default)]
struct ScriptedStore {
    callbacks: Mutex<HashMap<String, SetSnapshotCallback>>,
    write_started: Mutex<Option<oneshot::Sender<()>>>,
    write_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl ScriptedStore {
    /// Returns (started, release) for the next write.
    fn pause_next_write(&self) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        *self.write_started.lock().unwrap() = Some(started_tx);
        *self.write_gate.lock().unwrap() = Some(release_rx);
        (started_rx, release_tx)
    }

    fn deliver(&self, principal_id: &str, snapshot: StoreResult<BTreeSet<String>>) {
        let callback = self.callbacks.lock().unwrap().get(principal_id).cloned();
        if let Some(callback) = callback {
            callback(snapshot);
        }
    }

    async fn paused_failure(&self) -> StoreResult<()> {
        let started = self.write_started.lock().unwrap().take();
        if let Some(started) = started {
            let _ = started.send(());
        }
        let gate = self.write_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Err(unavailable("write rejected"))
    }
}

#[async_trait]
impl RemoteSetStore for ScriptedStore {
    fn subscribe(
        &self,
        principal_id: &str,
        callback: SetSnapshotCallback,
    ) -> StoreResult<SetListenerRegistration> {
        self.callbacks
            .lock()
            .unwrap()
            .insert(principal_id.to_string(), callback);
        Ok(SetListenerRegistration::new(|| {}))
    }

    async fn fetch(&self, _principal_id: &str) -> StoreResult<BTreeSet<String>> {
        Ok(BTreeSet::new())
    }

    async fn insert(&self, _principal_id: &str, _item_id: &str) -> StoreResult<()> {
        self.paused_failure().await
    }

    async fn remove(&self, _principal_id: &str, _item_id: &str) -> StoreResult<()> {
        self.paused_failure().await
    }
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn scripted_session(
    store: Arc<ScriptedStore>,
    identity: Arc<InMemoryIdentity>,
) -> Arc<FavoritesSession> {
    let session = FavoritesSession::builder()
        .identity(identity)
        .store(store)
        .build();
    session.start();
    session
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_write_does_not_touch_the_next_principal() {
    let store = Arc::new(ScriptedStore::default());
    let identity = Arc::new(InMemoryIdentity::signed_in(Principal::new("u1")));
    let session = scripted_session(store.clone(), identity.clone());
    store.deliver("u1", Ok(set(&["a"])));
    session.wait_until_ready().await;

    let (started, release) = store.pause_next_write();
    let toggling = {
        let session = session.clone();
        tokio::spawn(async move { session.toggle("a").await })
    };
    started.await.unwrap();
    assert!(!session.has("a"));

    identity.sign_in(Principal::new("u2"));
    store.deliver("u2", Ok(set(&["x"])));
    assert_eq!(session.read(), vec!["x".to_string()]);

    release.send(()).unwrap();
    let err = toggling.await.unwrap().unwrap_err();
    assert!(matches!(err, FavoritesError::RemoteUnavailable(_)));

    assert_eq!(session.principal().unwrap().uid, "u2");
    assert_eq!(session.read(), vec!["x".to_string()]);
    assert!(!session.has("a"));
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_write_restores_the_same_principal() {
    let store = Arc::new(ScriptedStore::default());
    let identity = Arc::new(InMemoryIdentity::signed_in(Principal::new("u1")));
    let session = scripted_session(store.clone(), identity);
    store.deliver("u1", Ok(set(&["a"])));
    session.wait_until_ready().await;

    let (_started, release) = store.pause_next_write();
    release.send(()).unwrap();
    let err = session.toggle("b").await.unwrap_err();
    assert!(matches!(err, FavoritesError::RemoteUnavailable(_)));
    assert_eq!(session.read(), vec!["a".to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn subscription_error_after_snapshot_keeps_mirror() {
    let store = Arc::new(ScriptedStore::default());
    let identity = Arc::new(InMemoryIdentity::signed_in(Principal::new("u1")));
    let session = scripted_session(store.clone(), identity);
    assert_eq!(session.state(), SessionState::AwaitingFirstSnapshot);

    store.deliver("u1", Ok(set(&["a", "b"])));
    session.wait_until_ready().await;

    store.deliver("u1", Err(unavailable("poll failed")));
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.is_ready());
    assert_eq!(session.read(), vec!["a".to_string(), "b".to_string()]);

    store.deliver("u1", Ok(set(&["c"])));
    assert_eq!(session.read(), vec!["c".to_string()]);
}
