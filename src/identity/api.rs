use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex};

use crate::identity::model::Principal;
use crate::logger::Logger;
use crate::util::{PartialObserver, Unsubscribe};

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@veritybridge/identity"));

/// Stream of authentication state changes.
///
/// Implementations must call a newly registered observer with the current
/// value before returning, then once per change, in the order the provider
/// issues them.
pub trait IdentityStream: Send + Sync {
    fn current(&self) -> Option<Principal>;

    fn on_principal_changed(&self, observer: PartialObserver<Option<Principal>>) -> Unsubscribe;
}

/// Identity provider kept in process memory.
///
/// Used by tests and by embedders that drive sign-in themselves (for example a
/// wasm shell forwarding `onAuthStateChanged` events).
#[derive(Default)]
pub struct InMemoryIdentity {
    current: Mutex<Option<Principal>>,
    emit_lock: Mutex<()>,
    listeners: Arc<PrincipalListeners>,
}

#[derive(Default)]
struct PrincipalListeners {
    next_id: AtomicU64,
    observers: Mutex<Vec<(u64, PartialObserver<Option<Principal>>)>>,
}

impl PrincipalListeners {
    fn add(&self, observer: PartialObserver<Option<Principal>>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.observers.lock().unwrap().push((id, observer));
        id
    }

    fn remove(&self, id: u64) {
        self.observers
            .lock()
            .unwrap()
            .retain(|(observer_id, _)| *observer_id != id);
    }

    fn notify(&self, principal: &Option<Principal>) {
        let observers: Vec<_> = self
            .observers
            .lock()
            .unwrap()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer.notify(principal);
        }
    }

    fn len(&self) -> usize {
        self.observers.lock().unwrap().len()
    }
}

impl InMemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(principal: Principal) -> Self {
        let identity = Self::default();
        *identity.current.lock().unwrap() = Some(principal);
        identity
    }

    pub fn sign_in(&self, principal: Principal) {
        self.emit(Some(principal));
    }

    pub fn sign_out(&self) {
        self.emit(None);
    }

    pub fn observer_count(&self) -> usize {
        self.listeners.len()
    }

    fn emit(&self, principal: Option<Principal>) {
        let _emit = self.emit_lock.lock().unwrap();
        *self.current.lock().unwrap() = principal.clone();
        match &principal {
            Some(principal) => LOGGER.debug(format!("principal changed to {}", principal.uid)),
            None => LOGGER.debug("principal signed out"),
        }
        self.listeners.notify(&principal);
    }
}

impl IdentityStream for InMemoryIdentity {
    fn current(&self) -> Option<Principal> {
        self.current.lock().unwrap().clone()
    }

    fn on_principal_changed(&self, observer: PartialObserver<Option<Principal>>) -> Unsubscribe {
        let _emit = self.emit_lock.lock().unwrap();
        observer.notify(&self.current());
        let id = self.listeners.add(observer);

        let listeners = Arc::downgrade(&self.listeners);
        Box::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.remove(id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_observer() -> (
        PartialObserver<Option<Principal>>,
        Arc<Mutex<Vec<Option<String>>>>,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = PartialObserver::new().with_next(move |principal: &Option<Principal>| {
            sink.lock()
                .unwrap()
                .push(principal.as_ref().map(|p| p.uid.clone()));
        });
        (observer, seen)
    }

    #[test]
    fn observer_receives_current_value_then_changes() {
        let identity = InMemoryIdentity::signed_in(Principal::new("u1"));
        let (observer, seen) = recording_observer();
        let _unsubscribe = identity.on_principal_changed(observer);

        identity.sign_out();
        identity.sign_in(Principal::new("u2"));

        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[Some("u1".to_string()), None, Some("u2".to_string())]
        );
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let identity = InMemoryIdentity::new();
        let (observer, seen) = recording_observer();
        let unsubscribe = identity.on_principal_changed(observer);
        assert_eq!(identity.observer_count(), 1);

        unsubscribe();
        identity.sign_in(Principal::new("u1"));

        assert_eq!(identity.observer_count(), 0);
        assert_eq!(seen.lock().unwrap().as_slice(), &[None]);
        assert_eq!(identity.current().unwrap().uid, "u1");
    }
}
