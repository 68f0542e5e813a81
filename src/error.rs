//! # Error Module
//!
//! Typed errors for the research pipeline. Every failure aborts the current
//! research run and is handed back to the caller unchanged.

use thiserror::Error;

// =============================================================================
// SEARCH API ERRORS
// =============================================================================
/// Typed errors from a web search backend.
#[derive(Debug, Error)]
pub enum SearchApiError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized - check API key")]
    Unauthorized,

    #[error("Rate limited - too many requests")]
    RateLimited,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("HTTP error ({0}): {1}")]
    HttpError(u16, String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl SearchApiError {
    /// Transient failures worth another attempt when retries are enabled.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SearchApiError::Timeout
                | SearchApiError::Connection(_)
                | SearchApiError::RateLimited
                | SearchApiError::ServerError(_, _)
        )
    }
}

impl From<reqwest::Error> for SearchApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SearchApiError::Timeout
        } else if e.is_connect() {
            SearchApiError::Connection(e.to_string())
        } else if e.is_decode() {
            SearchApiError::ParseError(e.to_string())
        } else {
            SearchApiError::Network(e.to_string())
        }
    }
}

// =============================================================================
// TOP-LEVEL RESEARCH ERROR
// =============================================================================
/// Errors surfaced by a research run.
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Language model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Search API error: {0}")]
    SearchApi(#[from] SearchApiError),

    #[error("Search returned no documents for query: {query}")]
    EmptyResult { query: String },
}

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, ResearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_error_retryable() {
        assert!(SearchApiError::Timeout.is_retryable());
        assert!(SearchApiError::RateLimited.is_retryable());
        assert!(SearchApiError::ServerError(502, String::new()).is_retryable());
        assert!(SearchApiError::Connection("refused".to_string()).is_retryable());

        assert!(!SearchApiError::Unauthorized.is_retryable());
        assert!(!SearchApiError::BadRequest("empty query".to_string()).is_retryable());
        assert!(!SearchApiError::ParseError("eof".to_string()).is_retryable());
    }

    #[test]
    fn test_search_error_into_research_error() {
        let err: ResearchError = SearchApiError::RateLimited.into();
        assert!(matches!(err, ResearchError::SearchApi(SearchApiError::RateLimited)));
        assert!(err.to_string().contains("Rate limited"));
    }

    #[test]
    fn test_empty_result_display() {
        let err = ResearchError::EmptyResult {
            query: "quantum batteries".to_string(),
        };
        assert!(err.to_string().contains("quantum batteries"));
    }
}
