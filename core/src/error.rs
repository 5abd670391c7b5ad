//! Error type shared by every client operation.
//!
//! # Design
//! A response can fail in two independent ways: the envelope carries a
//! non-zero `errno`, or the HTTP status is outside 2xx. A non-zero `errno` is
//! reported as `Service` whatever the status. A non-2xx status without a
//! failure envelope is reported as `HttpError` with the raw body.

use thiserror::Error;

/// Errors returned by client operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response: connection refused, timeout,
    /// broken socket.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The service answered with a non-zero `errno`.
    #[error("service error {errno}: {errmsg}")]
    Service { errno: i64, errmsg: String },

    /// Non-2xx status whose body is not a failure envelope.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body or its `data` payload could not be decoded.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// Client configuration is missing or invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// The service error code, if this is a service-level failure.
    pub fn errno(&self) -> Option<i64> {
        match self {
            ApiError::Service { errno, .. } => Some(*errno),
            _ => None,
        }
    }

    /// True for `errno` 404 and for HTTP 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Service { errno: 404, .. })
            || matches!(self, ApiError::HttpError { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_displays_code_and_message() {
        let err = ApiError::Service {
            errno: 500,
            errmsg: "internal server error".to_string(),
        };
        assert_eq!(err.to_string(), "service error 500: internal server error");
        assert_eq!(err.errno(), Some(500));
    }

    #[test]
    fn not_found_matches_both_layers() {
        let service = ApiError::Service {
            errno: 404,
            errmsg: "user not found".to_string(),
        };
        let http = ApiError::HttpError {
            status: 404,
            body: String::new(),
        };
        assert!(service.is_not_found());
        assert!(http.is_not_found());
        assert!(!ApiError::Transport("refused".to_string()).is_not_found());
    }
}
