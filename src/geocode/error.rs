use std::fmt;

pub type GeocodeResult<T> = Result<T, GeocodeError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocodeError {
    InvalidArgument(String),
    /// The service answered with a non-success status.
    Http { status: u16, message: String },
    Network(String),
    Parse(String),
}

impl fmt::Display for GeocodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeocodeError::InvalidArgument(message) => write!(f, "Invalid argument: {message}"),
            GeocodeError::Http { status, message } => {
                write!(f, "Geocoding failed with HTTP {status}: {message}")
            }
            GeocodeError::Network(message) => write!(f, "Network error: {message}"),
            GeocodeError::Parse(message) => write!(f, "Unexpected geocoding response: {message}"),
        }
    }
}

impl std::error::Error for GeocodeError {}
