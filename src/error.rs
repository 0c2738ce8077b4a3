//! Error taxonomy for the scrape and report pipelines.
//!
//! [`Error::Connectivity`] and [`Error::Structural`] abort a ticket run early;
//! the caller turns them into an empty result and a printed diagnostic.
//! [`ExtractionError`] never leaves the [`crate::extract`] module: a tier that
//! fails is logged and treated as having found nothing.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure: timeout, DNS, refused connection, TLS.
    #[error("connectivity failure during {step}: {reason}")]
    Connectivity { step: &'static str, reason: String },

    /// An element the pipeline depends on is missing from the markup.
    #[error("page structure changed: {what}")]
    Structural { what: String },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub fn connectivity(step: &'static str, source: impl std::fmt::Display) -> Self {
        Error::Connectivity {
            step,
            reason: source.to_string(),
        }
    }

    pub fn structural(what: impl Into<String>) -> Self {
        Error::Structural { what: what.into() }
    }

    /// Whether this error should end a ticket run with an empty result.
    pub fn aborts_run(&self) -> bool {
        matches!(self, Error::Connectivity { .. } | Error::Structural { .. })
    }
}

/// Failure inside a single extraction tier.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: &'static str, reason: String },

    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_message_names_step() {
        let err = Error::connectivity("select_origin", "operation timed out");
        assert_eq!(
            err.to_string(),
            "connectivity failure during select_origin: operation timed out"
        );
        assert!(err.aborts_run());
    }

    #[test]
    fn test_structural_aborts_run() {
        let err = Error::structural("javax.faces.ViewState input absent");
        assert!(err.aborts_run());
        assert!(err.to_string().contains("ViewState"));
    }

    #[test]
    fn test_io_does_not_abort_run() {
        let err: Error = std::io::Error::other("disk full").into();
        assert!(!err.aborts_run());
    }
}
