//! Research state
//!
//! The mutable accumulator owned by one research run. Two growth rules are
//! enforced here rather than trusted to the model:
//! - `running_summary` is never truncated
//! - `sources_gathered` only grows, keyed by URL so duplicates never count twice

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::search::SearchResult;

/// Optional narrowing of the research topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchFocus {
    /// Specific company to focus on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    /// Metrics to analyze
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<String>,

    /// Analysis method, e.g. "SWOT analysis"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_method: Option<String>,
}

impl ResearchFocus {
    pub fn is_empty(&self) -> bool {
        self.company.is_none() && self.metrics.is_empty() && self.analysis_method.is_none()
    }
}

/// What one completed loop iteration did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord {
    /// 1-based iteration number
    pub iteration: usize,
    /// Query that was searched
    pub query: String,
    /// Number of documents the search returned
    pub sources_found: usize,
    /// Gaps named by the reflection step
    pub knowledge_gaps: Vec<String>,
    /// Query proposed for the next iteration
    pub follow_up_query: String,
}

/// The complete state of one research invocation.
///
/// Serialize-only: the URL index behind source deduplication is not part of
/// the output, so a state cannot be resumed from JSON.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResearchState {
    /// User-supplied research topic
    pub topic: String,

    /// Optional focus applied to query generation
    #[serde(skip_serializing_if = "ResearchFocus::is_empty")]
    pub focus: ResearchFocus,

    /// Completed query → search → summarize → reflect cycles
    pub loop_count: usize,

    /// Query used by the most recent (or next) search
    pub search_query: String,

    /// Results of the most recent search
    pub search_results: Vec<SearchResult>,

    /// Cumulative synthesis of everything seen so far
    pub running_summary: String,

    /// Formatted citations, in first-seen order
    pub sources_gathered: Vec<String>,

    /// Latest follow-up query from reflection
    pub follow_up_query: String,

    /// Latest knowledge gaps from reflection
    pub knowledge_gaps: Vec<String>,

    /// History of completed iterations
    pub iterations: Vec<IterationRecord>,

    /// Structured report, empty until finalized
    pub final_report: String,

    #[serde(skip)]
    seen_urls: HashSet<String>,
}

impl ResearchState {
    /// Create an empty state for a topic.
    pub fn new(topic: impl Into<String>, focus: ResearchFocus) -> Self {
        Self {
            topic: topic.into(),
            focus,
            ..Default::default()
        }
    }

    /// Store a fresh search result set and merge its citations.
    ///
    /// Returns the number of citations that were new.
    pub fn record_search_results(&mut self, results: Vec<SearchResult>) -> usize {
        let mut added = 0;
        for result in &results {
            if self.seen_urls.insert(result.url.clone()) {
                self.sources_gathered.push(result.citation());
                added += 1;
            }
        }
        self.search_results = results;
        added
    }

    /// Fold a newly generated summary into `running_summary`.
    ///
    /// A candidate at least as long as the current summary replaces it. A
    /// shorter one is appended as a new section so nothing is lost. The
    /// summarize step rejects empty candidates before they get here.
    pub fn merge_summary(&mut self, candidate: &str) {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            debug!("Model returned an empty summary; keeping the existing one");
            return;
        }

        if candidate.chars().count() >= self.running_summary.chars().count() {
            self.running_summary = candidate.to_string();
        } else {
            debug!(
                previous_chars = self.running_summary.chars().count(),
                candidate_chars = candidate.chars().count(),
                "Updated summary is shorter; appending instead of replacing"
            );
            self.running_summary.push_str("\n\n");
            self.running_summary.push_str(candidate);
        }
    }

    /// Word count of the final report.
    pub fn report_word_count(&self) -> usize {
        self.final_report.split_whitespace().count()
    }

    /// Whether the final report has been written.
    pub fn is_finalized(&self) -> bool {
        !self.final_report.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(url: &str) -> SearchResult {
        SearchResult::new(format!("Title {}", url), url, "content")
    }

    #[test]
    fn test_new_state_is_empty() {
        let state = ResearchState::new("quantum batteries", ResearchFocus::default());
        assert_eq!(state.topic, "quantum batteries");
        assert_eq!(state.loop_count, 0);
        assert!(state.running_summary.is_empty());
        assert!(state.sources_gathered.is_empty());
        assert!(!state.is_finalized());
    }

    #[test]
    fn test_sources_deduplicated_by_url() {
        let mut state = ResearchState::new("t", ResearchFocus::default());

        let added = state.record_search_results(vec![result("https://a.com"), result("https://b.com")]);
        assert_eq!(added, 2);

        let mut renamed = result("https://a.com");
        renamed.title = "Different title".to_string();
        let added = state.record_search_results(vec![renamed, result("https://c.com")]);

        assert_eq!(added, 1);
        assert_eq!(state.sources_gathered.len(), 3);
        assert_eq!(state.search_results.len(), 2);
        assert_eq!(state.sources_gathered[0], "* Title https://a.com : https://a.com");
    }

    #[test]
    fn test_merge_summary_replaces_longer() {
        let mut state = ResearchState::new("t", ResearchFocus::default());
        state.merge_summary("short");
        state.merge_summary("a much longer summary");
        assert_eq!(state.running_summary, "a much longer summary");
    }

    #[test]
    fn test_merge_summary_never_shrinks() {
        let mut state = ResearchState::new("t", ResearchFocus::default());
        state.merge_summary("a fairly long first summary");
        let before = state.running_summary.len();

        state.merge_summary("tiny");
        assert!(state.running_summary.len() >= before);
        assert!(state.running_summary.starts_with("a fairly long first summary"));
        assert!(state.running_summary.ends_with("tiny"));

        state.merge_summary("   ");
        assert!(state.running_summary.ends_with("tiny"));
    }

    #[test]
    fn test_report_word_count() {
        let mut state = ResearchState::new("t", ResearchFocus::default());
        state.final_report = "## Report\n\nThree more words".to_string();
        assert_eq!(state.report_word_count(), 5);
        assert!(state.is_finalized());
    }

    #[test]
    fn test_state_serialization_skips_internal_fields() {
        let mut state = ResearchState::new("t", ResearchFocus::default());
        state.record_search_results(vec![result("https://a.com")]);
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("seen_urls").is_none());
        assert!(json.get("focus").is_none());
        assert_eq!(json["sources_gathered"].as_array().unwrap().len(), 1);
    }
}
