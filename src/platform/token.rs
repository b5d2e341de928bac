use std::error::Error;
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;

/// Error returned by token providers when an ID token cannot be obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenError {
    message: String,
}

impl TokenError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn from_error(err: impl Error) -> Self {
        Self::new(err.to_string())
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for TokenError {}

/// Source of the bearer token attached to Firestore REST calls.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait AsyncTokenProvider: Send + Sync {
    async fn get_token(&self, force_refresh: bool) -> Result<Option<String>, TokenError>;
}

/// Token provider holding a fixed token, swapped by the embedding app whenever
/// the identity provider refreshes it. `None` sends unauthenticated requests.
#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    token: Mutex<Option<String>>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.lock().unwrap() = token;
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl AsyncTokenProvider for StaticTokenProvider {
    async fn get_token(&self, _force_refresh: bool) -> Result<Option<String>, TokenError> {
        Ok(self.token.lock().unwrap().clone())
    }
}
