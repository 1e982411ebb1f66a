use thiserror::Error;

use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Session expired - sign in again")]
    SessionExpired,

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Structured field errors reported by the server (e.g. "email has already been taken")
    #[error("Rejected by server: {0}")]
    Rejected(serde_json::Value),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("GraphQL error: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut cut = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            400 => ApiError::BadRequest(truncated),
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            422 => match serde_json::from_str(body) {
                Ok(value) => ApiError::Rejected(value),
                Err(_) => ApiError::Rejected(serde_json::Value::String(truncated)),
            },
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// The server refused the credentials or the request outright, as
    /// opposed to the exchange failing in transit.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized
                | ApiError::AccessDenied(_)
                | ApiError::BadRequest(_)
                | ApiError::NotFound(_)
                | ApiError::Rejected(_)
        )
    }

    /// Whether this error means the caller is no longer authenticated.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized | ApiError::SessionExpired | ApiError::NotSignedIn
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_REQUEST, "{\"error\":\"invalid_grant\"}"),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream"),
            ApiError::ServerError(_)
        ));
    }

    #[test]
    fn test_unprocessable_keeps_structured_body() {
        let err = ApiError::from_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"errors":{"email":["has already been taken"]}}"#,
        );
        match err {
            ApiError::Rejected(value) => {
                assert_eq!(value["errors"]["email"][0], "has already been taken")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "é".repeat(400);
        match ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body) {
            ApiError::ServerError(msg) => {
                assert!(msg.contains("truncated, 800 total bytes"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rejection_vs_transport() {
        assert!(ApiError::BadRequest(String::new()).is_rejection());
        assert!(!ApiError::ServerError(String::new()).is_rejection());
        assert!(!ApiError::RateLimited.is_rejection());
        assert!(ApiError::SessionExpired.is_auth_failure());
    }
}
