use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not authenticated - please log in")]
    Unauthenticated,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rejected by server: {0}")]
    Validation(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    Server(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error envelope returned by the catalog API.
/// `message` is usually a string but validation failures send a list.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<serde_json::Value>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut = (0..=MAX_ERROR_BODY_LENGTH)
                .rev()
                .find(|&i| body.is_char_boundary(i))
                .unwrap_or(0);
            format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
        }
    }

    /// Pull the human-readable `message` out of an API error body,
    /// falling back to the raw body.
    pub fn extract_message(body: &str) -> String {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .and_then(|m| Self::message_text(&m));

        Self::truncate_body(message.as_deref().unwrap_or(body))
    }

    /// Render a `message` value, which may be a string or a list of strings.
    pub(crate) fn message_text(message: &serde_json::Value) -> Option<String> {
        let text = match message {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::extract_message(body);
        match status.as_u16() {
            401 => ApiError::Unauthenticated,
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            400 | 422 => ApiError::Validation(message),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::Server(message),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, message)),
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ApiError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_maps_taxonomy() {
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, "").is_unauthenticated());
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, r#"{"success":false,"message":"找不到產品"}"#),
            ApiError::NotFound(ref m) if m == "找不到產品"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_REQUEST, "bad"),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream"),
            ApiError::Server(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::IM_A_TEAPOT, ""),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_extract_message_variants() {
        assert_eq!(
            ApiError::extract_message(r#"{"success":false,"message":"登入失敗"}"#),
            "登入失敗"
        );
        assert_eq!(
            ApiError::extract_message(r#"{"success":false,"message":["title 欄位為必填","price 欄位為必填"]}"#),
            "title 欄位為必填; price 欄位為必填"
        );
        // Non-JSON bodies are passed through
        assert_eq!(ApiError::extract_message("Bad Gateway"), "Bad Gateway");
        // Empty message falls back to the raw body
        assert_eq!(
            ApiError::extract_message(r#"{"message":""}"#),
            r#"{"message":""}"#
        );
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.ends_with("(truncated, 520 total bytes)"));

        // Multi-byte text is cut on a char boundary
        let wide = "產".repeat(300);
        let truncated = ApiError::truncate_body(&wide);
        assert!(truncated.contains("truncated"));
    }
}
