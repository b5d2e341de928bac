use crate::identity::Navigator;
use crate::logger::Logger;
use std::sync::LazyLock;

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@veritybridge/browser"));

/// [`Navigator`] backed by `window.location`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowNavigator;

impl Navigator for WindowNavigator {
    fn current_path(&self) -> String {
        let Some(window) = web_sys::window() else {
            return String::new();
        };
        let location = window.location();
        let path = location.pathname().unwrap_or_default();
        let search = location.search().unwrap_or_default();
        format!("{path}{search}")
    }

    fn navigate(&self, href: &str) {
        let Some(window) = web_sys::window() else {
            LOGGER.warn("no window available; navigation skipped");
            return;
        };
        if let Err(err) = window.location().set_href(href) {
            LOGGER.error(format!("navigation to {href} failed: {err:?}"));
        }
    }
}
