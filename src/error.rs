//! Crate-wide error type.
//!
//! Every fallible operation returns [`Result`]. Validation failures are
//! recoverable at the request boundary and end up as a message in the
//! response envelope; storage failures abort the current request only.

use thiserror::Error;

/// All errors produced by the social graph library.
#[derive(Debug, Error)]
pub enum SocialGraphError {
    /// The identifier token could not be parsed as an integer.
    #[error("Invalid User ID")]
    InvalidIdentifier(String),

    /// The identifier parsed to zero, which means "no identifier supplied".
    #[error("Specify a correct User ID")]
    MissingIdentifier,

    /// The record store could not be opened.
    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),

    /// A query failed at the storage layer.
    #[error("record store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// The bulk-load input is missing or malformed.
    #[error("{0}")]
    LoadInput(String),

    /// The configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SocialGraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_user_facing() {
        assert_eq!(
            SocialGraphError::InvalidIdentifier("abc".into()).to_string(),
            "Invalid User ID"
        );
        assert_eq!(
            SocialGraphError::MissingIdentifier.to_string(),
            "Specify a correct User ID"
        );
    }

    #[test]
    fn store_error_carries_cause_text() {
        let err: SocialGraphError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(err.to_string().starts_with("record store error:"));
    }

    #[test]
    fn load_input_message_is_passed_through() {
        let err = SocialGraphError::LoadInput("Specify a correct JSON data filename".into());
        assert_eq!(err.to_string(), "Specify a correct JSON data filename");
    }
}
