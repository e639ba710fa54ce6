//! Error types for the headshot transformation.

use std::time::Duration;

/// Shown when the selected file is not an image.
pub const INVALID_FILE_MESSAGE: &str = "Please upload a valid image file.";

/// Shown when the selected file could not be read.
pub const READ_FAILED_MESSAGE: &str = "Failed to read the file.";

/// Shown for every failure of the external transformation call.
pub const TRANSFORM_FAILED_MESSAGE: &str = "Transformation failed. Please try again later.";

/// Shown when a file is selected while another attempt is still running.
pub const BUSY_MESSAGE: &str = "A transformation is already in progress.";

/// Maximum length of an API error body kept in an error value.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while reading, transforming or saving a photo.
#[derive(Debug, thiserror::Error)]
pub enum ProPhotoError {
    /// The input was rejected before any I/O (wrong media type, empty mime type).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The selected file could not be read.
    #[error("failed to read file: {0}")]
    ReadFailure(String),

    /// API key missing or rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned a non-success response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit or quota exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Content was blocked by the service's safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// The response carried no inline image part.
    #[error("no image produced: {0}")]
    NoImage(String),

    /// Base64 payload could not be decoded.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// The attempt was cancelled by a reset.
    #[error("operation cancelled")]
    Cancelled,

    /// A transformation is already in flight.
    #[error("a transformation is already in progress")]
    Busy,

    /// Network or HTTP transport error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (e.g., saving the result).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProPhotoError {
    /// Returns the coarse, user-safe message for this error.
    ///
    /// Every failure of the external call collapses to the same string; the
    /// detail stays in the error value for operator-side logging.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => INVALID_FILE_MESSAGE,
            Self::ReadFailure(_) => READ_FAILED_MESSAGE,
            Self::Busy => BUSY_MESSAGE,
            _ => TRANSFORM_FAILED_MESSAGE,
        }
    }

    /// Returns true if the failure came from the external transformation call.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::Auth(_)
                | Self::Api { .. }
                | Self::RateLimited { .. }
                | Self::ContentBlocked(_)
                | Self::NoImage(_)
                | Self::Network(_)
                | Self::Json(_)
        )
    }

    /// Short, stable tag for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::ReadFailure(_) => "read_failure",
            Self::Auth(_) => "auth",
            Self::Api { .. } => "api",
            Self::RateLimited { .. } => "rate_limited",
            Self::ContentBlocked(_) => "content_blocked",
            Self::NoImage(_) => "no_image",
            Self::Decode(_) => "decode",
            Self::Cancelled => "cancelled",
            Self::Busy => "busy",
            Self::Network(_) => "network",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

/// Result type alias for headshot operations.
pub type Result<T> = std::result::Result<T, ProPhotoError>;

/// Trims an API error body down to something safe to keep in an error.
///
/// Pulls `error.message` out of a JSON body when there is one, collapses
/// whitespace and truncates on a char boundary.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let extracted = serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| text.to_string());

    let collapsed = extracted.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return collapsed;
    }
    let truncated: String = collapsed.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
    format!("{truncated}...")
}

/// Reads a `Retry-After` header given in seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
