//! Custom error types for scholarhub.
//!
//! Every fallible operation in the library returns `Result<T, SearchError>`.
//! Provider failures are surfaced to the caller as-is; nothing here retries.

use crate::models::Provider;
use thiserror::Error;

/// Longest body excerpt kept in a transport error message.
const BODY_SNIPPET_LEN: usize = 200;

/// Main error type for scholarhub operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Non-success HTTP status, network failure or timeout talking to a provider.
    ///
    /// `status` is `None` when no response was received at all.
    #[error("{provider} request failed{}: {message}", status_suffix(.status))]
    Transport {
        provider: Provider,
        status: Option<u16>,
        message: String,
    },

    /// Missing credential or unusable configuration. Raised before any network call.
    #[error("Config error: {0}")]
    Config(String),

    /// Caller supplied something we cannot act on (empty identifier, unknown source, ...)
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Provider payload could not be decoded at all
    #[error("Parse error: {0}")]
    Parse(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

impl SearchError {
    /// Build a transport error from a non-success response body.
    pub fn status(provider: Provider, status: u16, body: &str) -> Self {
        let snippet: String = body.chars().take(BODY_SNIPPET_LEN).collect();
        SearchError::Transport {
            provider,
            status: Some(status),
            message: snippet,
        }
    }

    /// Build a transport error for a request that never produced a response.
    pub fn network(provider: Provider, err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else {
            err.to_string()
        };
        SearchError::Transport {
            provider,
            status: None,
            message,
        }
    }

    /// HTTP status the aggregation endpoint answers with for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            SearchError::MalformedInput(_) => 400,
            SearchError::Transport { .. } | SearchError::Parse(_) => 502,
            _ => 500,
        }
    }
}

/// Result type alias using `SearchError`
pub type Result<T> = std::result::Result<T, SearchError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a malformed-input message
    fn ok_or_malformed(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_malformed(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| SearchError::MalformedInput(msg.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_message_names_provider_and_status() {
        let err = SearchError::status(Provider::Crossref, 503, "upstream busy");
        assert_eq!(err.to_string(), "Crossref request failed (503): upstream busy");
        assert_eq!(err.http_status(), 502);
    }

    #[test]
    fn test_body_snippet_is_truncated() {
        let body = "x".repeat(1000);
        match SearchError::status(Provider::OpenAlex, 500, &body) {
            SearchError::Transport { message, .. } => assert_eq!(message.len(), BODY_SNIPPET_LEN),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ok_or_malformed() {
        let missing: Option<&str> = None;
        let err = missing.ok_or_malformed("Missing identifier").expect_err("should fail");
        assert_eq!(err.http_status(), 400);
    }
}
