//! Tavily Search backend
//!
//! POSTs queries to the Tavily Search API and maps HTTP failures onto
//! [`SearchApiError`]. Retrying is off unless `with_max_retries` is set to a
//! non-zero value, in which case transient errors back off exponentially.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{SearchResult, WebSearch};
use crate::error::{ResearchError, Result, SearchApiError};

/// Production API endpoint
const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

/// Default timeout for Tavily API requests
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Base delay for exponential backoff (milliseconds)
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Tavily rejects queries longer than this
pub const MAX_QUERY_CHARS: usize = 400;

/// Search depth for Tavily API
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    /// Fast search with basic results
    #[default]
    Basic,
    /// More thorough search with detailed results
    Advanced,
}

impl SearchDepth {
    fn as_str(&self) -> &'static str {
        match self {
            SearchDepth::Basic => "basic",
            SearchDepth::Advanced => "advanced",
        }
    }
}

impl FromStr for SearchDepth {
    type Err = ResearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "advanced" => Ok(Self::Advanced),
            other => Err(ResearchError::Configuration(format!(
                "unknown search depth '{}' (expected 'basic' or 'advanced')",
                other
            ))),
        }
    }
}

impl fmt::Display for SearchDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tavily Search client
///
/// # Example
/// ```ignore
/// let search = TavilySearch::new("tvly-...").with_max_results(5);
/// let results = search.search("solid-state battery chemistry").await?;
/// ```
pub struct TavilySearch {
    api_key: String,
    client: Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    max_results: usize,
    search_depth: SearchDepth,
}

impl TavilySearch {
    /// Create a new client with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: 0,
            max_results: 5,
            search_depth: SearchDepth::Basic,
        }
    }

    /// Point the client at a different host (used by tests and proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set custom max retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the number of results requested per query (clamped to 1..=20)
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.clamp(1, 20);
        self
    }

    pub fn with_search_depth(mut self, depth: SearchDepth) -> Self {
        self.search_depth = depth;
        self
    }

    /// Execute HTTP request, retrying transient failures when enabled
    async fn execute_with_retry(
        &self,
        request: &TavilyRequest<'_>,
    ) -> std::result::Result<TavilyResponse, SearchApiError> {
        let mut attempt = 0;
        loop {
            match self.execute_single_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = Duration::from_millis(RETRY_BASE_DELAY_MS * 2u64.pow(attempt - 1));
                    warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "Tavily request failed, will retry");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Execute a single HTTP request
    async fn execute_single_request(
        &self,
        request: &TavilyRequest<'_>,
    ) -> std::result::Result<TavilyResponse, SearchApiError> {
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            return response
                .json::<TavilyResponse>()
                .await
                .map_err(|e| SearchApiError::ParseError(e.to_string()));
        }

        let error_text = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 | 403 => Err(SearchApiError::Unauthorized),
            429 => Err(SearchApiError::RateLimited),
            400 => Err(SearchApiError::BadRequest(error_text)),
            500..=599 => Err(SearchApiError::ServerError(status.as_u16(), error_text)),
            code => Err(SearchApiError::HttpError(code, error_text)),
        }
    }
}

/// Request body for Tavily API
#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
    include_answer: bool,
    include_raw_content: bool,
}

/// Response from Tavily API
#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

/// Individual search result
#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: Option<f64>,
}

impl From<TavilyResult> for SearchResult {
    fn from(r: TavilyResult) -> Self {
        SearchResult {
            title: r.title,
            url: r.url,
            content: r.content,
            score: r.score,
        }
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        if query.chars().count() > MAX_QUERY_CHARS {
            return Err(SearchApiError::BadRequest(format!(
                "Query too long (max {} characters)",
                MAX_QUERY_CHARS
            ))
            .into());
        }

        info!(query = %query, depth = %self.search_depth, "Performing Tavily search");

        let request = TavilyRequest {
            query,
            max_results: self.max_results,
            search_depth: self.search_depth.as_str(),
            include_answer: false,
            include_raw_content: false,
        };

        let response = self.execute_with_retry(&request).await?;
        debug!(count = response.results.len(), "Tavily search completed");

        Ok(response.results.into_iter().map(SearchResult::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_depth_serialization() {
        assert_eq!(SearchDepth::Basic.as_str(), "basic");
        assert_eq!(SearchDepth::Advanced.as_str(), "advanced");

        let json = serde_json::to_string(&SearchDepth::Advanced).unwrap();
        assert_eq!(json, r#""advanced""#);

        let parsed: SearchDepth = "Basic".parse().unwrap();
        assert_eq!(parsed, SearchDepth::Basic);
        assert!("deep".parse::<SearchDepth>().is_err());
    }

    #[test]
    fn test_builder_pattern() {
        let search = TavilySearch::new("test-key")
            .with_timeout(Duration::from_secs(60))
            .with_max_retries(5)
            .with_max_results(50)
            .with_base_url("http://localhost:9999/");

        assert_eq!(search.timeout, Duration::from_secs(60));
        assert_eq!(search.max_retries, 5);
        assert_eq!(search.max_results, 20);
        assert_eq!(search.base_url, "http://localhost:9999");
    }

    #[test]
    fn test_retries_disabled_by_default() {
        let search = TavilySearch::new("test-key");
        assert_eq!(search.max_retries, 0);
    }
}
