//! # Remote set store
//!
//! Per-principal sets of item identifiers, observable as a stream of
//! snapshots. The favorites session mirrors one of these sets at a time.
//!
//! Two backends ship with the crate:
//!
//! - [`MemoryRemoteSetStore`] keeps sets in process memory and can simulate
//!   rejected listeners, failed writes and snapshots that arrive late.
//! - [`FirestoreSetStore`] reads and writes `users/{uid}/favorites/{itemId}`
//!   documents through the Firestore REST API and polls for changes. It also
//!   creates the `users/{uid}` profile on first sign-in.
//!
//! [`value`] converts between plain JSON and Firestore typed values for the
//! other REST-backed collections.
//!
//! ## Example
//!
//! ```
//! use std::collections::BTreeSet;
//! use std::sync::Arc;
//! use veritybridge::store::{MemoryRemoteSetStore, RemoteSetStore, StoreResult};
//!
//! let store = MemoryRemoteSetStore::new();
//! store.seed("user-1", ["l-100", "l-200"]);
//! let registration = store
//!     .subscribe("user-1", Arc::new(|snapshot: StoreResult<BTreeSet<String>>| {
//!         println!("favorites: {:?}", snapshot);
//!     }))
//!     .unwrap();
//! registration.detach();
//! ```

mod api;
mod connection;
mod error;
mod memory;
mod rest;
pub mod value;

#[doc(inline)]
pub use api::{RemoteSetStore, SetListenerRegistration, SetSnapshotCallback};

#[doc(inline)]
pub use error::{
    internal_error, invalid_argument, not_found, permission_denied, unauthenticated, unavailable,
    StoreError, StoreErrorCode, StoreResult,
};

#[doc(inline)]
pub use memory::MemoryRemoteSetStore;

#[doc(inline)]
pub use rest::{FirestoreSetStore, FirestoreSetStoreBuilder};

pub(crate) use connection::{document_id, encode_segment, FirestoreConnection};
