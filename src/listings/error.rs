use std::fmt;

use crate::store::StoreError;

pub type ListingsResult<T> = Result<T, ListingsError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingsError {
    NotAuthenticated,
    Forbidden(String),
    /// The listing form is incomplete.
    Validation(String),
    Store(StoreError),
    /// Listing data could not be decoded.
    Data(String),
}

impl fmt::Display for ListingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingsError::NotAuthenticated => write!(f, "Sign in to manage listings"),
            ListingsError::Forbidden(message) => write!(f, "Not allowed: {message}"),
            ListingsError::Validation(message) => write!(f, "{message}"),
            ListingsError::Store(err) => write!(f, "{err}"),
            ListingsError::Data(message) => write!(f, "Invalid listing data: {message}"),
        }
    }
}

impl std::error::Error for ListingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListingsError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ListingsError {
    fn from(error: StoreError) -> Self {
        ListingsError::Store(error)
    }
}

impl From<serde_json::Error> for ListingsError {
    fn from(error: serde_json::Error) -> Self {
        ListingsError::Data(error.to_string())
    }
}
