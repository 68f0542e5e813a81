//! DuckDuckGo search backend
//!
//! Scrapes the DuckDuckGo HTML endpoint, which needs no API key. Results
//! are pulled from the `result__a` / `result__snippet` markup; redirect
//! links (`uddg=`) are decoded back to the target URL.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{SearchResult, WebSearch};
use crate::error::{Result, SearchApiError};

const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Web search through DuckDuckGo's HTML results page.
#[derive(Debug, Clone)]
pub struct DuckDuckGoSearch {
    max_results: usize,
    base_url: String,
    timeout: Duration,
}

impl DuckDuckGoSearch {
    pub fn new(max_results: usize) -> Self {
        Self {
            max_results: max_results.max(1),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Parse DuckDuckGo HTML into results, skipping ads and duplicate URLs.
    fn parse_html(&self, html: &str) -> Vec<SearchResult> {
        let mut results = Vec::new();
        let mut seen_urls = HashSet::new();

        for block in html.split("class=\"result__a\"").skip(1) {
            if results.len() >= self.max_results {
                break;
            }

            let Some(url) = extract_attr(block, "href=\"").and_then(resolve_link) else {
                continue;
            };

            if url.contains("duckduckgo.com") || !seen_urls.insert(url.clone()) {
                continue;
            }

            let title = block
                .find('>')
                .and_then(|start| {
                    let rest = &block[start + 1..];
                    rest.find("</a>").map(|end| clean_text(&rest[..end]))
                })
                .filter(|t| !t.is_empty())
                .or_else(|| extract_domain(&url))
                .unwrap_or_else(|| "Result".to_string());

            let content = block
                .find("class=\"result__snippet\"")
                .and_then(|pos| {
                    let rest = &block[pos..];
                    let start = rest.find('>')? + 1;
                    let tail = &rest[start..];
                    let end = tail.find("</a>").or_else(|| tail.find("</div>"))? + start;
                    Some(clean_text(&rest[start..end]))
                })
                .unwrap_or_default();

            results.push(SearchResult::new(title, url, content));
        }

        results
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        info!(query = %query, "Performing DuckDuckGo search");

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(SearchApiError::from)?;

        let url = format!(
            "{}/html/?q={}",
            self.base_url,
            urlencoding::encode(query)
        );

        debug!(url = %url, "Fetching search results");

        let response = client.get(&url).send().await.map_err(SearchApiError::from)?;

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(SearchApiError::RateLimited.into());
            }
            let body = response.text().await.unwrap_or_default();
            return Err(SearchApiError::HttpError(status.as_u16(), body).into());
        }

        let body = response.text().await.map_err(SearchApiError::from)?;
        let results = self.parse_html(&body);

        if results.is_empty() {
            warn!(query = %query, "No search results found");
        } else {
            info!(query = %query, count = results.len(), "Search completed");
        }

        Ok(results)
    }
}

/// Value of the first `marker"..."` attribute in `fragment`.
fn extract_attr<'a>(fragment: &'a str, marker: &str) -> Option<&'a str> {
    let start = fragment.find(marker)? + marker.len();
    let rest = &fragment[start..];
    rest.find('"').map(|end| &rest[..end])
}

/// Turn a DuckDuckGo result href into the target URL.
fn resolve_link(href: &str) -> Option<String> {
    let href = decode_entities(href);

    if let Some(pos) = href.find("uddg=") {
        let encoded = &href[pos + 5..];
        let encoded = encoded.split('&').next().unwrap_or(encoded);
        return urlencoding::decode(encoded)
            .ok()
            .map(|u| u.into_owned())
            .filter(|u| u.starts_with("http"));
    }

    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }

    href.starts_with("http").then_some(href)
}

/// Extract the domain name from a URL.
fn extract_domain(url: &str) -> Option<String> {
    url.split("//")
        .nth(1)?
        .split('/')
        .next()
        .map(|s| s.to_string())
}

/// Strip tags and decode the handful of entities DuckDuckGo emits.
fn clean_text(fragment: &str) -> String {
    let mut text = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    decode_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
}
