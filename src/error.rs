use reqwest::StatusCode;
use serde::Deserialize;

/// Failure of a single API call. The client never recovers these; they
/// surface to whichever view issued the call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not authorized ({status}): {}", describe(.message.as_deref(), .status))]
    Auth { status: u16, message: Option<String> },
    #[error("rejected by server ({status}): {}", describe(.message.as_deref(), .status))]
    Validation { status: u16, message: Option<String> },
    #[error("not found: {}", describe(.message.as_deref(), &404))]
    NotFound { message: Option<String> },
    #[error("conflict: {}", describe(.message.as_deref(), &409))]
    Conflict { message: Option<String> },
    #[error("server error ({status}): {}", describe(.message.as_deref(), .status))]
    Server { status: u16, message: Option<String> },
    #[error("network failure: {0}")]
    Network(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("session storage: {0}")]
    Session(#[from] crate::session::SessionError),
}

/// Backend message if one was sent, else the status reason phrase.
fn describe(message: Option<&str>, status: &u16) -> String {
    match message {
        Some(m) => m.to_string(),
        None => StatusCode::from_u16(*status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("request failed")
            .to_string(),
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    message: Option<String>,
}

impl ApiError {
    /// Classify a non-2xx response. `body` is the raw response text; its
    /// `message` field is kept when present and non-blank.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty());
        let code = status.as_u16();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Auth { status: code, message },
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::Validation { status: code, message }
            }
            StatusCode::NOT_FOUND => ApiError::NotFound { message },
            StatusCode::CONFLICT => ApiError::Conflict { message },
            _ => ApiError::Server { status: code, message },
        }
    }

    /// HTTP status carried by the failure, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Auth { status, .. }
            | ApiError::Validation { status, .. }
            | ApiError::Server { status, .. } => Some(*status),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Conflict { .. } => Some(409),
            ApiError::Network(_) | ApiError::Decode(_) | ApiError::Session(_) => None,
        }
    }

    /// Message the backend put in the response body, if any. Never the
    /// reason phrase.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Auth { message, .. }
            | ApiError::Validation { message, .. }
            | ApiError::NotFound { message }
            | ApiError::Conflict { message }
            | ApiError::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_statuses() {
        assert!(matches!(
            ApiError::from_response(StatusCode::UNAUTHORIZED, ""),
            ApiError::Auth { status: 401, .. }
        ));
        assert!(matches!(
            ApiError::from_response(StatusCode::FORBIDDEN, ""),
            ApiError::Auth { status: 403, .. }
        ));
        assert!(matches!(
            ApiError::from_response(StatusCode::UNPROCESSABLE_ENTITY, ""),
            ApiError::Validation { .. }
        ));
        assert!(matches!(
            ApiError::from_response(StatusCode::NOT_FOUND, ""),
            ApiError::NotFound { .. }
        ));
        assert!(matches!(
            ApiError::from_response(StatusCode::CONFLICT, ""),
            ApiError::Conflict { .. }
        ));
        assert!(matches!(
            ApiError::from_response(StatusCode::BAD_GATEWAY, ""),
            ApiError::Server { status: 502, .. }
        ));
    }

    #[test]
    fn test_uses_backend_message() {
        let err = ApiError::from_response(StatusCode::UNAUTHORIZED, r#"{"message":"Invalid credentials"}"#);
        assert_eq!(err.server_message(), Some("Invalid credentials"));
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn test_reason_phrase_only_in_display() {
        let err = ApiError::from_response(StatusCode::NOT_FOUND, "<html>oops</html>");
        assert_eq!(err.server_message(), None);
        assert_eq!(err.to_string(), "not found: Not Found");

        let err = ApiError::from_response(StatusCode::CONFLICT, r#"{"message":"  "}"#);
        assert_eq!(err.server_message(), None);
        assert_eq!(err.to_string(), "conflict: Conflict");

        let err = ApiError::from_response(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(err.server_message(), None);
        assert_eq!(err.to_string(), "server error (500): Internal Server Error");
    }

    #[test]
    fn test_error_field_counts_as_backend_message() {
        let err = ApiError::from_response(StatusCode::BAD_REQUEST, r#"{"error":"title is required"}"#);
        assert_eq!(err.server_message(), Some("title is required"));
        assert_eq!(err.to_string(), "rejected by server (400): title is required");
    }

    #[test]
    fn test_network_error_has_no_status() {
        let err = ApiError::Network("connection refused".to_string());
        assert_eq!(err.status(), None);
        assert_eq!(err.server_message(), None);
    }
}
