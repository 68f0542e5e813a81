//! # Search Module
//!
//! The web search capability used by the research loop, plus two backends:
//! - [`TavilySearch`]: Tavily Search API (needs an API key)
//! - [`DuckDuckGoSearch`]: DuckDuckGo HTML endpoint (no key)
//!
//! The orchestrator only sees the [`WebSearch`] trait, so tests swap in
//! deterministic stubs.

mod duckduckgo;
mod tavily;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{Config, SearchProvider};
use crate::error::{ResearchError, Result};

pub use duckduckgo::DuckDuckGoSearch;
pub use tavily::{SearchDepth, TavilySearch, MAX_QUERY_CHARS as TAVILY_MAX_QUERY_CHARS};

// =============================================================================
// SEARCH RESULT
// =============================================================================
/// A single retrieved document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Page title
    pub title: String,

    /// Page URL
    pub url: String,

    /// Extracted content or snippet
    pub content: String,

    /// Relevance score (0-1) when the backend reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl SearchResult {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
            score: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Citation line collected into `sources_gathered`.
    pub fn citation(&self) -> String {
        format!("* {} : {}", self.title, self.url)
    }
}

// =============================================================================
// WEB SEARCH CAPABILITY
// =============================================================================
/// Sends a query to a search backend and returns ordered results.
///
/// Authentication failures, rate limiting and network errors all come back
/// as [`ResearchError::SearchApi`]. An empty vector is a valid answer here;
/// the orchestrator decides what an empty result set means.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}

/// Build the search backend selected in the configuration.
pub fn from_config(config: &Config) -> Result<Arc<dyn WebSearch>> {
    match config.search_provider {
        SearchProvider::Tavily => {
            let api_key = config.tavily_api_key.clone().ok_or_else(|| {
                ResearchError::Configuration("TAVILY_API_KEY environment variable not set".to_string())
            })?;
            let search = TavilySearch::new(api_key)
                .with_timeout(config.search_timeout)
                .with_max_retries(config.search_max_retries)
                .with_max_results(config.max_search_results)
                .with_search_depth(config.search_depth);
            Ok(Arc::new(search))
        }
        SearchProvider::DuckDuckGo => Ok(Arc::new(
            DuckDuckGoSearch::new(config.max_search_results).with_timeout(config.search_timeout),
        )),
    }
}
