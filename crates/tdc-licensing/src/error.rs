//! Licensing Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, LicensingError>;

/// Licensing-related errors
#[derive(Error, Debug)]
pub enum LicensingError {
    /// Configuration value missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Record store could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Inbound sale notification is unusable
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Caller-supplied request is unusable
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LicensingError {
    /// Whether repeating the same operation later could succeed
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_))
    }

    /// Get user-friendly message
    pub const fn user_message(&self) -> &str {
        match self {
            Self::Config(_) => "Service configuration error.",
            Self::Storage(_) | Self::Io(_) | Self::Json(_) => {
                "License records are temporarily unavailable."
            }
            Self::WebhookParse(_) => "Invalid webhook data",
            Self::InvalidRequest(_) => "Invalid request.",
        }
    }
}

/// Why a candidate string is not a well-formed license code
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    #[error("empty or missing code")]
    Empty,

    #[error("expected 3 hyphen-separated segments, found {0}")]
    SegmentCount(usize),

    #[error("unknown prefix")]
    Prefix,

    #[error("unknown year")]
    Year,

    #[error("body must be 5 characters, found {0}")]
    BodyLength(usize),

    #[error("body must contain only A-Z and 0-9")]
    BodyAlphabet,

    #[error("checksum mismatch")]
    Checksum,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_failures_are_retryable() {
        assert!(LicensingError::Storage("disk full".into()).is_retryable());
        assert!(LicensingError::Io(std::io::Error::other("timed out")).is_retryable());
    }

    #[test]
    fn test_bad_input_is_not_retryable() {
        assert!(!LicensingError::WebhookParse("no email".into()).is_retryable());
        assert!(!LicensingError::InvalidRequest("no email".into()).is_retryable());
        assert!(!LicensingError::Config("bad year".into()).is_retryable());

        let corrupt = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(!LicensingError::Json(corrupt).is_retryable());
    }

    #[test]
    fn test_webhook_message_is_fixed() {
        let err = LicensingError::WebhookParse("sale has no buyer email".into());
        assert_eq!(err.user_message(), "Invalid webhook data");
    }
}
