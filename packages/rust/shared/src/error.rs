//! Error types for docbinder.
//!
//! Library crates use [`DocbinderError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all docbinder operations.
#[derive(Debug, thiserror::Error)]
pub enum DocbinderError {
    /// The bearer token was rejected (invalid or revoked).
    #[error("unauthenticated: {message}")]
    Unauthenticated { message: String },

    /// A collection or document is missing, inaccessible, or unpublished.
    #[error("{what} not found: {message}")]
    NotFound { what: String, message: String },

    /// The remote service throttled the request.
    #[error("rate limited: {message}")]
    RateLimited { message: String },

    /// The document tree is not a finite tree (cycle, duplicate id, or too deep/large).
    #[error("malformed document tree: {message}")]
    MalformedTree { message: String },

    /// Markup could not be converted to HTML.
    #[error("render failure: {message}")]
    RenderFailure { message: String },

    /// Network/transport failure, including timeouts.
    #[error("connection error: {0}")]
    Connection(String),

    /// The service answered with a status or body outside the known contract.
    #[error("unexpected response (HTTP {status}): {message}")]
    UnexpectedResponse { status: u16, message: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocbinderError>;

impl DocbinderError {
    /// Create a not-found error for the named kind of object.
    pub fn not_found(what: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::NotFound {
            what: what.into(),
            message: msg.into(),
        }
    }

    /// Create a malformed-tree error from any displayable message.
    pub fn malformed_tree(msg: impl Into<String>) -> Self {
        Self::MalformedTree {
            message: msg.into(),
        }
    }

    /// Create a render failure from any displayable message.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::RenderFailure {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether a failure fetching a single document should skip that
    /// document instead of aborting the run.
    ///
    /// Credential and throttling errors affect every later call too, so they
    /// stay fatal.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Connection(_) | Self::UnexpectedResponse { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = DocbinderError::not_found("document", "abc was deleted");
        assert_eq!(err.to_string(), "document not found: abc was deleted");

        let err = DocbinderError::UnexpectedResponse {
            status: 502,
            message: "bad gateway".into(),
        };
        assert!(err.to_string().contains("HTTP 502"));
    }

    #[test]
    fn skip_policy() {
        assert!(DocbinderError::not_found("document", "gone").is_skippable());
        assert!(DocbinderError::Connection("timed out".into()).is_skippable());
        assert!(
            !DocbinderError::Unauthenticated {
                message: "revoked".into()
            }
            .is_skippable()
        );
        assert!(
            !DocbinderError::RateLimited {
                message: "slow down".into()
            }
            .is_skippable()
        );
        assert!(!DocbinderError::malformed_tree("cycle").is_skippable());
    }
}
