use std::error::Error;
use std::fmt::{Display, Formatter};

use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreErrorCode {
    InvalidArgument,
    Unauthenticated,
    PermissionDenied,
    NotFound,
    Unavailable,
    Internal,
}

impl StoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreErrorCode::InvalidArgument => "store/invalid-argument",
            StoreErrorCode::Unauthenticated => "store/unauthenticated",
            StoreErrorCode::PermissionDenied => "store/permission-denied",
            StoreErrorCode::NotFound => "store/not-found",
            StoreErrorCode::Unavailable => "store/unavailable",
            StoreErrorCode::Internal => "store/internal",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreError {
    pub code: StoreErrorCode,
    message: String,
}

impl StoreError {
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

pub fn invalid_argument(message: impl Into<String>) -> StoreError {
    StoreError::new(StoreErrorCode::InvalidArgument, message)
}

pub fn unauthenticated(message: impl Into<String>) -> StoreError {
    StoreError::new(StoreErrorCode::Unauthenticated, message)
}

pub fn permission_denied(message: impl Into<String>) -> StoreError {
    StoreError::new(StoreErrorCode::PermissionDenied, message)
}

pub fn not_found(message: impl Into<String>) -> StoreError {
    StoreError::new(StoreErrorCode::NotFound, message)
}

pub fn unavailable(message: impl Into<String>) -> StoreError {
    StoreError::new(StoreErrorCode::Unavailable, message)
}

pub fn internal_error(message: impl Into<String>) -> StoreError {
    StoreError::new(StoreErrorCode::Internal, message)
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: Option<GoogleError>,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Maps a failed Firestore REST response to a [`StoreError`].
pub(crate) fn map_http_error(status: StatusCode, body: &str) -> StoreError {
    let payload = serde_json::from_str::<GoogleErrorBody>(body)
        .ok()
        .and_then(|body| body.error);
    let message = payload
        .as_ref()
        .and_then(|error| error.message.clone())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("HTTP error").to_string());

    if let Some(code) = payload
        .as_ref()
        .and_then(|error| error.status.as_deref())
        .and_then(code_from_status_string)
    {
        return StoreError::new(code, message);
    }

    let code = match status {
        StatusCode::BAD_REQUEST | StatusCode::PRECONDITION_FAILED => StoreErrorCode::InvalidArgument,
        StatusCode::UNAUTHORIZED => StoreErrorCode::Unauthenticated,
        StatusCode::FORBIDDEN => StoreErrorCode::PermissionDenied,
        StatusCode::NOT_FOUND => StoreErrorCode::NotFound,
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT
        | StatusCode::REQUEST_TIMEOUT => StoreErrorCode::Unavailable,
        status if status.is_client_error() => StoreErrorCode::InvalidArgument,
        _ => StoreErrorCode::Internal,
    };
    StoreError::new(code, message)
}

fn code_from_status_string(status: &str) -> Option<StoreErrorCode> {
    match status {
        "INVALID_ARGUMENT" | "FAILED_PRECONDITION" | "OUT_OF_RANGE" => {
            Some(StoreErrorCode::InvalidArgument)
        }
        "UNAUTHENTICATED" => Some(StoreErrorCode::Unauthenticated),
        "PERMISSION_DENIED" => Some(StoreErrorCode::PermissionDenied),
        "NOT_FOUND" => Some(StoreErrorCode::NotFound),
        "UNAVAILABLE" | "DEADLINE_EXCEEDED" | "RESOURCE_EXHAUSTED" | "ABORTED" => {
            Some(StoreErrorCode::Unavailable)
        }
        "INTERNAL" | "UNKNOWN" | "DATA_LOSS" => Some(StoreErrorCode::Internal),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_status_wins_over_http_status() {
        let body = r#"{"error":{"code":400,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#;
        let err = map_http_error(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.code, StoreErrorCode::PermissionDenied);
        assert_eq!(err.message(), "Missing or insufficient permissions.");
    }

    #[test]
    fn falls_back_to_http_status() {
        let err = map_http_error(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(err.code, StoreErrorCode::Unavailable);
        assert_eq!(err.message(), "Service Unavailable");
        assert_eq!(err.to_string(), "Service Unavailable (store/unavailable)");
    }
}
