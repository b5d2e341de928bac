use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex, Weak};

use crate::config::MarketplaceConfig;
use crate::favorites::error::{FavoritesError, FavoritesResult};
use crate::favorites::latch::ReadinessLatch;
use crate::identity::{
    login_href, page_return_path, same_principal, IdentityStream, Navigator, Principal,
    DEFAULT_LOGIN_PAGE,
};
use crate::logger::Logger;
use crate::store::{RemoteSetStore, SetListenerRegistration, SetSnapshotCallback, StoreResult};
use crate::util::{PartialObserver, Unsubscribe};

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@veritybridge/favorites"));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No identity emission has been processed yet, or the backend is missing.
    Unbound,
    /// A principal is known and its set subscription has not delivered yet.
    AwaitingFirstSnapshot,
    /// The mirror reflects the last known snapshot (empty when signed out).
    Ready,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// `true` when the item was added, `false` when it was removed.
    pub saved: bool,
}

struct MirrorState {
    phase: SessionState,
    principal: Option<Principal>,
    generation: u64,
    items: BTreeSet<String>,
    registration: Option<SetListenerRegistration>,
}

impl Default for MirrorState {
    fn default() -> Self {
        Self {
            phase: SessionState::Unbound,
            principal: None,
            generation: 0,
            items: BTreeSet::new(),
            registration: None,
        }
    }
}

/// Local mirror of the signed-in principal's favorites.
///
/// The session follows an [`IdentityStream`] and keeps exactly one
/// [`RemoteSetStore`] subscription open, for the current principal. Reads are
/// synchronous against the mirror; [`FavoritesSession::toggle`] updates the
/// mirror optimistically and rolls the change back if the store rejects it.
///
/// Snapshots are tagged with the generation of the subscription that produced
/// them. A principal change bumps the generation, so a snapshot still in
/// flight for the previous principal is dropped instead of reaching the mirror.
pub struct FavoritesSession {
    identity: Option<Arc<dyn IdentityStream>>,
    store: Option<Arc<dyn RemoteSetStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    login_page: String,
    ready: ReadinessLatch,
    state: Mutex<MirrorState>,
    swap_lock: Mutex<()>,
    identity_subscription: Mutex<Option<Unsubscribe>>,
    started: AtomicBool,
    this: Weak<FavoritesSession>,
}

#[derive(Default)]
pub struct FavoritesSessionBuilder {
    identity: Option<Arc<dyn IdentityStream>>,
    store: Option<Arc<dyn RemoteSetStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    login_page: Option<String>,
}

impl FavoritesSessionBuilder {
    pub fn identity(mut self, identity: Arc<dyn IdentityStream>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn store(mut self, store: Arc<dyn RemoteSetStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Navigator used to send anonymous visitors to the login page.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn login_page(mut self, login_page: impl Into<String>) -> Self {
        self.login_page = Some(login_page.into());
        self
    }

    /// Builds the session. Nothing is subscribed until [`FavoritesSession::start`].
    pub fn build(self) -> Arc<FavoritesSession> {
        Arc::new_cyclic(|this| FavoritesSession {
            identity: self.identity,
            store: self.store,
            navigator: self.navigator,
            login_page: self
                .login_page
                .unwrap_or_else(|| DEFAULT_LOGIN_PAGE.to_string()),
            ready: ReadinessLatch::new(),
            state: Mutex::new(MirrorState::default()),
            swap_lock: Mutex::new(()),
            identity_subscription: Mutex::new(None),
            started: AtomicBool::new(false),
            this: this.clone(),
        })
    }
}

impl FavoritesSession {
    pub fn builder() -> FavoritesSessionBuilder {
        FavoritesSessionBuilder::default()
    }

    /// Builds a session wired to the given collaborators, using the login page
    /// from `config`.
    pub fn from_config(
        config: &MarketplaceConfig,
        identity: Arc<dyn IdentityStream>,
        store: Arc<dyn RemoteSetStore>,
        navigator: Option<Arc<dyn Navigator>>,
    ) -> Arc<Self> {
        let mut builder = Self::builder()
            .identity(identity)
            .store(store)
            .login_page(config.login_page.clone());
        if let Some(navigator) = navigator {
            builder = builder.navigator(navigator);
        }
        builder.build()
    }

    /// Subscribes to the identity stream. Later calls do nothing.
    ///
    /// Without an identity stream or a set store the session stays
    /// [`SessionState::Unbound`] with an empty mirror and readiness resolves
    /// right away.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let (Some(identity), Some(_)) = (self.identity.as_ref(), self.store.as_ref()) else {
            LOGGER.error("favorites backend unavailable; running without favorites");
            self.ready.resolve();
            return;
        };

        let session = self.this.clone();
        let observer = PartialObserver::new()
            .with_next(move |principal: &Option<Principal>| {
                if let Some(session) = session.upgrade() {
                    session.handle_principal(principal.clone());
                }
            })
            .with_error(|err| LOGGER.warn(format!("identity stream error: {err}")));
        let unsubscribe = identity.on_principal_changed(observer);
        *self.identity_subscription.lock().unwrap() = Some(unsubscribe);
    }

    /// Completes after the first determination of the favorites set.
    pub async fn wait_until_ready(&self) {
        self.ready.wait().await;
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_resolved()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.lock().unwrap().principal.is_some()
    }

    pub fn principal(&self) -> Option<Principal> {
        self.state.lock().unwrap().principal.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state.lock().unwrap().phase
    }

    pub fn has(&self, item_id: &str) -> bool {
        if item_id.is_empty() {
            return false;
        }
        self.state.lock().unwrap().items.contains(item_id)
    }

    /// Current favorites in ascending id order.
    pub fn read(&self) -> Vec<String> {
        self.state.lock().unwrap().items.iter().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    /// Header label, e.g. `❤️ Favorites (3)`.
    pub fn fav_count_label(&self) -> String {
        format!("❤️ Favorites ({})", self.count())
    }

    /// Returns `true` when signed in; otherwise sends the visitor to the login page.
    pub fn ensure_logged_in(&self) -> bool {
        if self.is_logged_in() {
            return true;
        }
        self.redirect_to_login();
        false
    }

    /// Adds `item_id` if absent, removes it otherwise.
    ///
    /// The mirror changes before the store call completes. When the store
    /// rejects the change, the mirror is restored (unless the principal changed
    /// in the meantime) and [`FavoritesError::RemoteUnavailable`] is returned.
    pub async fn toggle(&self, item_id: &str) -> FavoritesResult<ToggleOutcome> {
        if item_id.trim().is_empty() {
            return Err(FavoritesError::InvalidArgument(
                "item id must be non-empty".to_string(),
            ));
        }

        let claimed = {
            let mut state = self.state.lock().unwrap();
            match (state.principal.clone(), self.store.clone()) {
                (Some(principal), Some(store)) => {
                    let saved = state.items.insert(item_id.to_string());
                    if !saved {
                        state.items.remove(item_id);
                    }
                    Some((principal, store, state.generation, saved))
                }
                _ => None,
            }
        };
        let Some((principal, store, generation, saved)) = claimed else {
            LOGGER.info("favorite toggled while signed out");
            self.redirect_to_login();
            return Err(FavoritesError::NotAuthenticated);
        };

        let result = if saved {
            store.insert(principal.uid(), item_id).await
        } else {
            store.remove(principal.uid(), item_id).await
        };

        match result {
            Ok(()) => {
                LOGGER.debug(format!(
                    "favorite {item_id} {}",
                    if saved { "saved" } else { "removed" }
                ));
                Ok(ToggleOutcome { saved })
            }
            Err(err) => {
                {
                    let mut state = self.state.lock().unwrap();
                    if state.generation == generation {
                        if saved {
                            state.items.remove(item_id);
                        } else {
                            state.items.insert(item_id.to_string());
                        }
                    }
                }
                LOGGER.error(format!("failed to update favorite {item_id}: {err}"));
                Err(FavoritesError::RemoteUnavailable(err))
            }
        }
    }

    fn redirect_to_login(&self) {
        let Some(navigator) = self.navigator.as_ref() else {
            return;
        };
        let return_to = page_return_path(&navigator.current_path());
        navigator.navigate(&login_href(&self.login_page, &return_to));
    }

    fn handle_principal(&self, principal: Option<Principal>) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let _swap = self.swap_lock.lock().unwrap();

        let (generation, previous) = {
            let mut state = self.state.lock().unwrap();
            if state.phase != SessionState::Unbound
                && same_principal(state.principal.as_ref(), principal.as_ref())
            {
                state.principal = principal;
                return;
            }
            state.generation += 1;
            state.principal = principal.clone();
            state.items.clear();
            state.phase = if principal.is_some() {
                SessionState::AwaitingFirstSnapshot
            } else {
                SessionState::Ready
            };
            (state.generation, state.registration.take())
        };
        if let Some(previous) = previous {
            previous.detach();
        }

        let Some(principal) = principal else {
            LOGGER.debug("signed out; favorites cleared");
            self.ready.resolve();
            return;
        };

        let session = self.this.clone();
        let callback: SetSnapshotCallback = Arc::new(move |snapshot| {
            if let Some(session) = session.upgrade() {
                session.apply_snapshot(generation, snapshot);
            }
        });
        match store.subscribe(principal.uid(), callback) {
            Ok(registration) => {
                self.state.lock().unwrap().registration = Some(registration);
            }
            Err(err) => self.apply_snapshot(generation, Err(err)),
        }
    }

    fn apply_snapshot(&self, generation: u64, snapshot: StoreResult<BTreeSet<String>>) {
        let failure = {
            let mut state = self.state.lock().unwrap();
            if state.generation != generation {
                None
            } else {
                state.phase = SessionState::Ready;
                match snapshot {
                    Ok(items) => {
                        state.items = items;
                        Some(None)
                    }
                    Err(err) => Some(Some(err)),
                }
            }
        };

        match failure {
            None => {
                LOGGER.debug("dropped a snapshot from a previous principal");
                return;
            }
            Some(Some(err)) => {
                LOGGER.warn(format!("favorites subscription failed: {err}"));
            }
            Some(None) => {}
        }
        self.ready.resolve();
    }
}

impl Drop for FavoritesSession {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.identity_subscription.lock().unwrap().take() {
            unsubscribe();
        }
    }
}
