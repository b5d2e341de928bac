//! # Identity
//!
//! Principal model and the identity stream consumed by the favorites session,
//! plus the login redirect helpers shared by pages that require sign-in.
//!
//! The identity provider itself (Firebase Authentication) lives outside this
//! crate; an embedder forwards its auth state into an [`IdentityStream`]
//! implementation such as [`InMemoryIdentity`].
//!
//! ## Example
//!
//! ```
//! use veritybridge::identity::{IdentityStream, InMemoryIdentity, Principal};
//!
//! let identity = InMemoryIdentity::new();
//! identity.sign_in(Principal::new("user-1").with_email("seller@example.com"));
//! assert_eq!(identity.current().unwrap().uid, "user-1");
//! ```

mod api;
mod login;
mod model;
mod redirect;

#[doc(inline)]
pub use api::{IdentityStream, InMemoryIdentity};

#[doc(inline)]
pub use login::{auth_error_message, DEFAULT_ROLE};

#[doc(inline)]
pub use model::Principal;

pub(crate) use model::same_principal;

#[doc(inline)]
pub use redirect::{
    encode_component, login_href, page_name, page_return_path, return_to_from_query, AuthGuard,
    NavLinks, Navigator, RecordingNavigator, DEFAULT_LANDING_PAGE, DEFAULT_LOGIN_PAGE,
    FAVORITES_PAGE, SELL_PAGE,
};
