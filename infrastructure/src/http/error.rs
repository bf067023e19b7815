//! Error types for the HTTP session service adapter

use huddle_application::ServiceError;
use thiserror::Error;

/// Result type alias for HTTP adapter operations
pub type Result<T> = std::result::Result<T, HttpServiceError>;

/// Errors that can occur when talking to the session service over HTTP
#[derive(Error, Debug)]
pub enum HttpServiceError {
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse response: {error}\nRaw response: {raw}")]
    ParseError { error: String, raw: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl From<HttpServiceError> for ServiceError {
    fn from(err: HttpServiceError) -> Self {
        match err {
            HttpServiceError::Request(e) if e.is_timeout() => ServiceError::Timeout,
            HttpServiceError::Request(e) if e.is_connect() => {
                ServiceError::Connection(e.to_string())
            }
            HttpServiceError::Request(e) if e.is_decode() => {
                ServiceError::InvalidResponse(e.to_string())
            }
            HttpServiceError::Request(e) => ServiceError::Other(e.to_string()),
            HttpServiceError::Status { status, body } => ServiceError::Status {
                status,
                message: body,
            },
            HttpServiceError::ParseError { error, .. } => ServiceError::InvalidResponse(error),
            HttpServiceError::UnexpectedResponse(msg) => ServiceError::InvalidResponse(msg),
            HttpServiceError::InvalidBaseUrl(url) => {
                ServiceError::Other(format!("invalid base URL {}", url))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_maps_to_service_status() {
        let err: ServiceError = HttpServiceError::Status {
            status: 503,
            body: "down".to_string(),
        }
        .into();
        assert_eq!(
            err,
            ServiceError::Status {
                status: 503,
                message: "down".to_string()
            }
        );
    }

    #[test]
    fn test_parse_error_maps_to_invalid_response() {
        let err: ServiceError = HttpServiceError::ParseError {
            error: "expected value".to_string(),
            raw: "<html>".to_string(),
        }
        .into();
        assert_eq!(
            err,
            ServiceError::InvalidResponse("expected value".to_string())
        );
    }
}
