//! Error types for the retrieval engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during a search attempt.
///
/// Every variant except `Persistence` is caught once at the top of the
/// per-attempt procedure and converted into the synthetic failed-result
/// response; `Persistence` is logged and swallowed wherever it occurs and
/// never affects the returned response.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The automation backend could not start. Fatal for the attempt.
    #[error("browser launch failed: {0}")]
    LaunchFailure(String),

    /// A navigation did not complete within the caller's timeout.
    #[error("navigation timed out: {0}")]
    NavigationTimeout(String),

    /// The headed wait for manual challenge resolution exceeded its bound.
    #[error("verification challenge unresolved after {waited_ms} ms")]
    ChallengeUnresolved { waited_ms: u64 },

    /// No query-input element matched any candidate selector.
    #[error("no query input element found on the search page")]
    InputNotFound,

    /// Every extraction strategy, including the generic fallback, came up empty.
    #[error("no results extracted by any strategy")]
    ExtractionEmpty,

    /// State/fingerprint file write error. Always logged and ignored.
    #[error("state persistence failed: {0}")]
    Persistence(String),

    /// Any other automation (CDP) failure.
    #[error("automation failed: {0}")]
    Automation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_launch() {
        let err = SearchError::LaunchFailure("no executable".to_string());
        assert_eq!(err.to_string(), "browser launch failed: no executable");
    }

    #[test]
    fn test_error_display_challenge_unresolved() {
        let err = SearchError::ChallengeUnresolved { waited_ms: 120_000 };
        assert_eq!(
            err.to_string(),
            "verification challenge unresolved after 120000 ms"
        );
    }

    #[test]
    fn test_error_display_input_not_found() {
        let err = SearchError::InputNotFound;
        assert!(err.to_string().contains("query input"));
    }
}
