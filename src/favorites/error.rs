use std::fmt;

use crate::store::StoreError;

pub type FavoritesResult<T> = Result<T, FavoritesError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoritesError {
    /// No principal is signed in.
    NotAuthenticated,
    InvalidArgument(String),
    /// The backing store rejected or could not complete the request.
    RemoteUnavailable(StoreError),
}

impl fmt::Display for FavoritesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FavoritesError::NotAuthenticated => write!(f, "Sign in to save favorites"),
            FavoritesError::InvalidArgument(message) => write!(f, "Invalid argument: {message}"),
            FavoritesError::RemoteUnavailable(err) => write!(f, "Favorites store unavailable: {err}"),
        }
    }
}

impl std::error::Error for FavoritesError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FavoritesError::RemoteUnavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for FavoritesError {
    fn from(error: StoreError) -> Self {
        FavoritesError::RemoteUnavailable(error)
    }
}
