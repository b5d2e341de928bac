use std::sync::{Arc, LazyLock, Mutex};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::identity::api::IdentityStream;
use crate::identity::model::Principal;
use crate::logger::Logger;
use crate::util::{PartialObserver, Unsubscribe};

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@veritybridge/navigation"));

pub const DEFAULT_LOGIN_PAGE: &str = "login.html";
pub const DEFAULT_LANDING_PAGE: &str = "index.html";
pub const SELL_PAGE: &str = "sell.html";
pub const FAVORITES_PAGE: &str = "favorites.html";

/// Same character set as `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Page navigation capability. In the browser this is `window.location`.
pub trait Navigator: Send + Sync {
    /// Current location as `path[?query]`, e.g. `/results.html?mode=rent`.
    fn current_path(&self) -> String;

    fn navigate(&self, href: &str);
}

pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// `login.html?returnTo=<encoded return path>`.
pub fn login_href(login_page: &str, return_to: &str) -> String {
    format!("{login_page}?returnTo={}", encode_component(return_to))
}

/// Reduces a location to the page name plus query, the form used as `returnTo`.
pub fn page_return_path(location: &str) -> String {
    let (path, query) = match location.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (location, None),
    };
    let page = match path.rsplit('/').next() {
        Some(page) if !page.is_empty() => page,
        _ => DEFAULT_LANDING_PAGE,
    };
    match query {
        Some(query) if !query.is_empty() => format!("{page}?{query}"),
        _ => page.to_string(),
    }
}

/// Page name alone, the form the page guard uses as `returnTo`.
pub fn page_name(location: &str) -> String {
    let path = location.split(['?', '#']).next().unwrap_or_default();
    match path.rsplit('/').next() {
        Some(page) if !page.is_empty() => page.to_string(),
        _ => DEFAULT_LANDING_PAGE.to_string(),
    }
}

/// Reads `returnTo` from a login page query string.
///
/// Missing, empty or off-site targets fall back to the landing page, as do
/// targets pointing back at the login page.
pub fn return_to_from_query(query: &str) -> String {
    url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .find(|(key, _)| key == "returnTo")
        .map(|(_, value)| value.into_owned())
        .filter(|value| is_local_target(value))
        .unwrap_or_else(|| DEFAULT_LANDING_PAGE.to_string())
}

fn is_local_target(value: &str) -> bool {
    !value.is_empty()
        && !value.contains("://")
        && !value.starts_with("//")
        && !value.contains(DEFAULT_LOGIN_PAGE)
}

/// Navigator that records where it was sent instead of leaving the page.
#[derive(Debug)]
pub struct RecordingNavigator {
    location: Mutex<String>,
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: Mutex::new(location.into()),
            visits: Mutex::new(Vec::new()),
        }
    }

    pub fn set_location(&self, location: impl Into<String>) {
        *self.location.lock().unwrap() = location.into();
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }

    pub fn last_visit(&self) -> Option<String> {
        self.visits.lock().unwrap().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn current_path(&self) -> String {
        self.location.lock().unwrap().clone()
    }

    fn navigate(&self, href: &str) {
        self.visits.lock().unwrap().push(href.to_string());
    }
}

/// Sends the visitor to the login page whenever the principal becomes absent.
///
/// Installed on pages that require authentication. Dropping the guard removes
/// the identity subscription.
pub struct AuthGuard {
    unsubscribe: Mutex<Option<Unsubscribe>>,
}

impl AuthGuard {
    pub fn install(
        identity: &dyn IdentityStream,
        navigator: Arc<dyn Navigator>,
        login_page: impl Into<String>,
    ) -> Self {
        let login_page = login_page.into();
        let observer =
            PartialObserver::new().with_next(move |principal: &Option<Principal>| {
                if principal.is_some() {
                    return;
                }
                let return_to = page_name(&navigator.current_path());
                LOGGER.info(format!("page requires sign-in; redirecting from {return_to}"));
                navigator.navigate(&login_href(&login_page, &return_to));
            });
        let unsubscribe = identity.on_principal_changed(observer);
        Self {
            unsubscribe: Mutex::new(Some(unsubscribe)),
        }
    }

    pub fn release(&self) {
        if let Some(unsubscribe) = self.unsubscribe.lock().unwrap().take() {
            unsubscribe();
        }
    }
}

impl Drop for AuthGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Header navigation state for the current principal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavLinks {
    pub show_login: bool,
    pub show_logout: bool,
    pub sell_href: String,
    pub favorites_href: String,
}

impl NavLinks {
    pub fn for_principal(principal: Option<&Principal>, login_page: &str) -> Self {
        match principal {
            Some(_) => Self {
                show_login: false,
                show_logout: true,
                sell_href: SELL_PAGE.to_string(),
                favorites_href: FAVORITES_PAGE.to_string(),
            },
            None => Self {
                show_login: true,
                show_logout: false,
                sell_href: login_href(login_page, SELL_PAGE),
                favorites_href: login_href(login_page, FAVORITES_PAGE),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::InMemoryIdentity;

    #[test]
    fn login_href_encodes_like_uri_component() {
        assert_eq!(
            login_href("login.html", "results.html?mode=rent&q=new york"),
            "login.html?returnTo=results.html%3Fmode%3Drent%26q%3Dnew%20york"
        );
    }

    #[test]
    fn page_return_path_keeps_page_and_query() {
        assert_eq!(page_return_path("/site/listing.html?id=l-1"), "listing.html?id=l-1");
        assert_eq!(page_return_path("/sell.html"), "sell.html");
        assert_eq!(page_return_path("/"), "index.html");
        assert_eq!(page_return_path(""), "index.html");
    }

    #[test]
    fn return_to_defaults_and_rejects_off_site_targets() {
        assert_eq!(return_to_from_query("?returnTo=sell.html"), "sell.html");
        assert_eq!(
            return_to_from_query("returnTo=listing.html%3Fid%3Dl-1"),
            "listing.html?id=l-1"
        );
        assert_eq!(return_to_from_query(""), "index.html");
        assert_eq!(return_to_from_query("?returnTo="), "index.html");
        assert_eq!(
            return_to_from_query("?returnTo=https%3A%2F%2Fevil.example"),
            "index.html"
        );
    }

    #[test]
    fn return_to_never_points_back_at_login() {
        assert_eq!(return_to_from_query("?returnTo=login.html"), "index.html");
        assert_eq!(
            return_to_from_query("?returnTo=login.html%3FreturnTo%3Dsell.html"),
            "index.html"
        );
    }

    #[test]
    fn page_name_drops_query_and_fragment() {
        assert_eq!(page_name("/site/listing.html?id=l-1"), "listing.html");
        assert_eq!(page_name("/my_listings.html#top"), "my_listings.html");
        assert_eq!(page_name("/"), "index.html");
    }

    #[test]
    fn auth_guard_redirects_when_signed_out() {
        let identity = InMemoryIdentity::signed_in(Principal::new("u1"));
        let navigator = Arc::new(RecordingNavigator::new("/my_listings.html?tab=all"));
        let guard = AuthGuard::install(&identity, navigator.clone(), DEFAULT_LOGIN_PAGE);
        assert!(navigator.visits().is_empty());

        identity.sign_out();
        assert_eq!(
            navigator.last_visit().as_deref(),
            Some("login.html?returnTo=my_listings.html")
        );

        drop(guard);
        identity.sign_out();
        assert_eq!(navigator.visits().len(), 1);
    }

    #[test]
    fn nav_links_gate_sell_and_favorites() {
        let anonymous = NavLinks::for_principal(None, DEFAULT_LOGIN_PAGE);
        assert!(anonymous.show_login);
        assert_eq!(anonymous.sell_href, "login.html?returnTo=sell.html");
        assert_eq!(anonymous.favorites_href, "login.html?returnTo=favorites.html");

        let principal = Principal::new("u1");
        let signed_in = NavLinks::for_principal(Some(&principal), DEFAULT_LOGIN_PAGE);
        assert!(signed_in.show_logout);
        assert_eq!(signed_in.sell_href, "sell.html");
    }
}
