//! The `{error, message, results}` envelope every command prints.

use serde::Serialize;

use crate::error::{Result, SocialGraphError};
use crate::types::UserRecord;

/// Result of a single request, ready for serialization.
///
/// `error == true` always comes with an empty `results` list and a
/// non-empty `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub error: bool,
    pub message: String,
    pub results: Vec<UserRecord>,
}

impl Response {
    /// Successful query; the message stays empty.
    pub fn ok(results: Vec<UserRecord>) -> Self {
        Self::with_message(String::new(), results)
    }

    /// Successful request with an informational message.
    pub fn with_message(message: impl Into<String>, results: Vec<UserRecord>) -> Self {
        Self {
            error: false,
            message: message.into(),
            results,
        }
    }

    /// Failed request. Partial results are never carried alongside an error.
    pub fn failure(err: &SocialGraphError) -> Self {
        let mut message = err.to_string();
        if message.is_empty() {
            message = "Unknown error".to_string();
        }
        Self {
            error: true,
            message,
            results: Vec::new(),
        }
    }

    /// Render as compact or pretty JSON.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let out = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(out)
    }
}

impl From<Result<Vec<UserRecord>>> for Response {
    fn from(result: Result<Vec<UserRecord>>) -> Self {
        match result {
            Ok(results) => Self::ok(results),
            Err(err) => Self::failure(&err),
        }
    }
}
