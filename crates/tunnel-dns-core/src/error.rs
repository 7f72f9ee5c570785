//! Error types for the reconciliation engine
//!
//! This module defines all error types used throughout the crate.

use std::fmt;

use thiserror::Error;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the reconciliation engine
#[derive(Error, Debug)]
pub enum Error {
    /// A hostname is already routed to a different service
    #[error("rule for hostname {hostname} already exists: {service}")]
    Conflict {
        /// Hostname of the colliding rule
        hostname: String,
        /// Service the hostname is currently bound to
        service: String,
    },

    /// A mutation targeted a hostname absent from the rule set
    #[error("rule for hostname {0} does not exist")]
    NotFound(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// An underlying DNS/tunnel API failure, wrapped with the operation
    /// and target identifier
    #[error("failed to {operation} {target}: {message}")]
    Provider {
        /// Operation that failed (e.g. "create dns record")
        operation: String,
        /// Target of the operation (hostname, record id, ...)
        target: String,
        /// Underlying failure message
        message: String,
    },

    /// HTTP client errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// One or more provider failures collected from a single batch apply
    #[error(transparent)]
    Composite(#[from] ErrorList),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a not-found error for a hostname
    pub fn not_found(hostname: impl Into<String>) -> Self {
        Self::NotFound(hostname.into())
    }

    /// Create a provider error for an operation on a target
    pub fn provider(
        operation: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            operation: operation.into(),
            target: target.into(),
            message: message.into(),
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// Ordered list of failures from a single batch operation
///
/// Each underlying failure is preserved verbatim and individually
/// inspectable; `Display` joins them with "; " for a single-line summary.
#[derive(Debug, Default)]
pub struct ErrorList(Vec<Error>);

impl ErrorList {
    /// Create an empty error list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a failure, preserving arrival order
    pub fn push(&mut self, err: Error) {
        self.0.push(err);
    }

    /// Whether any failure has been collected
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of collected failures
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the collected failures in arrival order
    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.0.iter()
    }

    /// Convert into a `Result`: `Ok(())` when empty, a composite error
    /// otherwise
    pub fn into_result(self) -> Result<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(Error::Composite(self))
        }
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|err| err.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

impl std::error::Error for ErrorList {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_converts_to_ok() {
        assert!(ErrorList::new().into_result().is_ok());
    }

    #[test]
    fn display_joins_failures_in_order() {
        let mut errs = ErrorList::new();
        errs.push(Error::not_found("a.example.com"));
        errs.push(Error::provider("delete dns record", "record1", "boom"));

        assert_eq!(
            errs.to_string(),
            "rule for hostname a.example.com does not exist; \
             failed to delete dns record record1: boom"
        );
    }

    #[test]
    fn composite_preserves_individual_failures() {
        let mut errs = ErrorList::new();
        errs.push(Error::not_found("a.example.com"));
        errs.push(Error::not_found("b.example.com"));

        let err = errs.into_result().unwrap_err();
        let Error::Composite(list) = err else {
            panic!("expected composite error");
        };

        assert_eq!(list.len(), 2);
        assert!(matches!(list.iter().next(), Some(Error::NotFound(h)) if h == "a.example.com"));
    }
}
