//! # Favorites
//!
//! Keeps a local, synchronously readable mirror of the signed-in principal's
//! favorite listings and mediates changes to it.
//!
//! A [`FavoritesSession`] is built once per page with its collaborators
//! injected: an [`IdentityStream`](crate::identity::IdentityStream), a
//! [`RemoteSetStore`](crate::store::RemoteSetStore) and optionally a
//! [`Navigator`](crate::identity::Navigator) used for the login redirect.
//! Presentation code awaits [`FavoritesSession::wait_until_ready`] once, then
//! pulls state with `has`, `read` and `count`.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use veritybridge::favorites::FavoritesSession;
//! use veritybridge::identity::{InMemoryIdentity, Principal};
//! use veritybridge::store::MemoryRemoteSetStore;
//!
//! # futures::executor::block_on(async {
//! let store = MemoryRemoteSetStore::new();
//! store.seed("user-1", ["l-100"]);
//! let identity = Arc::new(InMemoryIdentity::signed_in(Principal::new("user-1")));
//!
//! let session = FavoritesSession::builder()
//!     .identity(identity)
//!     .store(Arc::new(store))
//!     .build();
//! session.start();
//! session.wait_until_ready().await;
//!
//! assert!(session.has("l-100"));
//! let outcome = session.toggle("l-200").await.unwrap();
//! assert!(outcome.saved);
//! assert_eq!(session.fav_count_label(), "❤️ Favorites (2)");
//! # });
//! ```

mod error;
mod latch;
mod session;

#[doc(inline)]
pub use error::{FavoritesError, FavoritesResult};

#[doc(inline)]
pub use latch::ReadinessLatch;

#[doc(inline)]
pub use session::{FavoritesSession, FavoritesSessionBuilder, SessionState, ToggleOutcome};
