//! Research prompt templates
//!
//! Pure string builders for the four research steps:
//! - Query writer: turns the topic (and any prior summary) into one search query
//! - Summarizer: folds new search results into the running summary
//! - Reflection: finds knowledge gaps and proposes a follow-up query
//! - Final report: writes the structured report with sources
//!
//! Each template opens with a distinct `#` heading so that logs (and test
//! doubles) can tell the steps apart.

use chrono::Utc;

use crate::search::SearchResult;
use crate::state::ResearchFocus;

/// Heading that opens the query-writer prompt
pub const QUERY_WRITER_HEADING: &str = "# Search Query Writer";
/// Heading that opens the summarizer prompt
pub const SUMMARIZER_HEADING: &str = "# Research Summarizer";
/// Heading that opens the reflection prompt
pub const REFLECTION_HEADING: &str = "# Research Reflection";
/// Heading that opens the final-report prompt
pub const FINAL_REPORT_HEADING: &str = "# Final Report Writer";

/// Label the reflection step must put in front of its follow-up query
pub const FOLLOW_UP_LABEL: &str = "Follow-up query:";

/// Prompt templates for the research loop
pub struct ResearchPrompts;

impl ResearchPrompts {
    /// Get the current date formatted for prompts
    fn current_date() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    /// Query writer prompt.
    ///
    /// With an empty `running_summary` this asks for an opening query; with
    /// a summary it asks for a query aimed at what the summary lacks.
    pub fn query_writer(
        topic: &str,
        focus: &ResearchFocus,
        running_summary: &str,
        max_query_length: usize,
    ) -> String {
        let focus_lines = focus_lines(focus);
        let summary_section = if running_summary.trim().is_empty() {
            String::new()
        } else {
            format!(
                "\n## Existing Summary\n\n{}\n\nTarget information this summary is missing.\n",
                running_summary.trim()
            )
        };

        format!(
            r#"{heading}

For context, today's date is {date}.

Create a single, focused web search query for research about: {topic}
{focus}{summary}
The query should:
- Be specific enough to get relevant results
- Include important domain keywords
- Cover both broad trends and specific details
- Be under {max} characters

Return only the query text, with no quotes, labels or explanation."#,
            heading = QUERY_WRITER_HEADING,
            date = Self::current_date(),
            topic = topic.trim(),
            focus = focus_lines,
            summary = summary_section,
            max = max_query_length,
        )
    }

    /// Summarizer prompt combining the prior summary with new results.
    ///
    /// Each result's content is cut to `max_source_chars` characters. Requested
    /// metrics are named so the summary keeps them in view.
    pub fn summarizer(
        topic: &str,
        focus: &ResearchFocus,
        running_summary: &str,
        results: &[SearchResult],
        max_source_chars: usize,
    ) -> String {
        let prior = if running_summary.trim().is_empty() {
            "(none yet)".to_string()
        } else {
            running_summary.trim().to_string()
        };

        let metrics = if focus.metrics.is_empty() {
            String::new()
        } else {
            format!(", focusing on {}", focus.metrics.join(", "))
        };

        format!(
            r#"{heading}

Update the research summary about: {topic}{metrics}

## Existing Summary

{prior}

## New Search Results

{sources}

## Instructions

Produce an updated, consolidated summary that keeps every fact from the
existing summary and integrates the new results. Include:
1. Key findings and statistics
2. Trends and patterns
3. Conflicting information
4. Notable missing information

Organize the summary clearly with headings. Return only the summary."#,
            heading = SUMMARIZER_HEADING,
            topic = topic.trim(),
            metrics = metrics,
            prior = prior,
            sources = format_results(results, max_source_chars),
        )
    }

    /// Reflection prompt asking for knowledge gaps and a follow-up query.
    pub fn reflection(topic: &str, running_summary: &str) -> String {
        format!(
            r#"{heading}

Analyze this research summary about {topic} and identify the 3 most important
knowledge gaps or unanswered questions that would improve the research.

Focus on:
- Missing data points
- Unclear trends
- Lack of specific examples
- Areas needing more depth

## Summary

{summary}

## Response Format

Knowledge gaps:
- [gap 1]
- [gap 2]
- [gap 3]
{label} [one web search query that addresses the most important gap]"#,
            heading = REFLECTION_HEADING,
            topic = topic.trim(),
            summary = running_summary.trim(),
            label = FOLLOW_UP_LABEL,
        )
    }

    /// Final report prompt.
    pub fn final_report(topic: &str, running_summary: &str, sources: &[String]) -> String {
        let summary = if running_summary.trim().is_empty() {
            "(no research findings were gathered)".to_string()
        } else {
            running_summary.trim().to_string()
        };
        let source_list = if sources.is_empty() {
            "(no sources)".to_string()
        } else {
            sources.join("\n")
        };

        format!(
            r#"{heading}

For context, today's date is {date}.

Write a detailed research report on: {topic}

## Research Summary

{summary}

## Sources

{sources}

## Report Structure

```markdown
## Executive Summary
[2-3 sentences capturing the core findings]

## Key Findings
### [Finding title]
[Narrative with inline citations]

## Contradictions & Uncertainties
[Where sources disagree or gaps remain]

## Recommendations
[Actionable takeaways]

### Sources
[Every source listed above]
```

Use clear section headings. Write as a professional report without
self-referential language."#,
            heading = FINAL_REPORT_HEADING,
            date = Self::current_date(),
            topic = topic.trim(),
            summary = summary,
            sources = source_list,
        )
    }
}

/// Optional focus lines for the query writer.
fn focus_lines(focus: &ResearchFocus) -> String {
    let mut lines = String::new();
    if let Some(company) = focus.company.as_deref() {
        lines.push_str(&format!("Focusing on company: {}\n", company));
    }
    if !focus.metrics.is_empty() {
        lines.push_str(&format!("Analyzing metrics: {}\n", focus.metrics.join(", ")));
    }
    if let Some(method) = focus.analysis_method.as_deref() {
        lines.push_str(&format!("Using analysis method: {}\n", method));
    }
    lines
}

/// Numbered source blocks for the summarizer.
fn format_results(results: &[SearchResult], max_source_chars: usize) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "Source {}: {}\nURL: {}\nContent: {}",
                i + 1,
                if r.title.is_empty() { "Untitled" } else { r.title.as_str() },
                r.url,
                truncate_chars(&r.content, max_source_chars)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Cut `text` to at most `max_chars` characters, marking the cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...[truncated]", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_writer_first_pass() {
        let prompt =
            ResearchPrompts::query_writer("quantum batteries", &ResearchFocus::default(), "", 400);
        assert!(prompt.starts_with(QUERY_WRITER_HEADING));
        assert!(prompt.contains("quantum batteries"));
        assert!(prompt.contains("under 400 characters"));
        assert!(prompt.contains("today's date is"));
        assert!(!prompt.contains("Existing Summary"));
    }

    #[test]
    fn test_query_writer_with_summary_and_focus() {
        let focus = ResearchFocus {
            company: Some("ChargePoint".to_string()),
            metrics: vec!["market share".to_string(), "growth rate".to_string()],
            analysis_method: Some("SWOT analysis".to_string()),
        };
        let prompt =
            ResearchPrompts::query_writer("EV charging", &focus, "Chargers are growing.", 200);
        assert!(prompt.contains("Focusing on company: ChargePoint"));
        assert!(prompt.contains("Analyzing metrics: market share, growth rate"));
        assert!(prompt.contains("Using analysis method: SWOT analysis"));
        assert!(prompt.contains("## Existing Summary"));
        assert!(prompt.contains("Chargers are growing."));
    }

    #[test]
    fn test_summarizer_lists_sources_and_truncates() {
        let results = vec![
            SearchResult::new("First", "https://a.com", "x".repeat(50)),
            SearchResult::new("", "https://b.com", "short"),
        ];
        let prompt = ResearchPrompts::summarizer("topic", &ResearchFocus::default(), "", &results, 10);
        assert!(prompt.starts_with(SUMMARIZER_HEADING));
        assert!(prompt.contains("Source 1: First\nURL: https://a.com"));
        assert!(prompt.contains("Source 2: Untitled"));
        assert!(prompt.contains(&format!("{}...[truncated]", "x".repeat(10))));
        assert!(prompt.contains("(none yet)"));
        assert!(!prompt.contains("focusing on"));
    }

    #[test]
    fn test_summarizer_names_requested_metrics() {
        let focus = ResearchFocus {
            metrics: vec!["market share".to_string(), "growth rate".to_string()],
            ..ResearchFocus::default()
        };
        let prompt = ResearchPrompts::summarizer("EV charging", &focus, "", &[], 100);
        assert!(prompt.contains("about: EV charging, focusing on market share, growth rate"));
    }

    #[test]
    fn test_summarizer_keeps_prior_summary() {
        let prompt = ResearchPrompts::summarizer("topic", &ResearchFocus::default(), "Prior facts.", &[], 100);
        assert!(prompt.contains("Prior facts."));
        assert!(!prompt.contains("(none yet)"));
    }

    #[test]
    fn test_reflection_prompt_format() {
        let prompt = ResearchPrompts::reflection("solar", "Panels are cheap.");
        assert!(prompt.starts_with(REFLECTION_HEADING));
        assert!(prompt.contains("Panels are cheap."));
        assert!(prompt.contains(FOLLOW_UP_LABEL));
        assert!(prompt.contains("Knowledge gaps:"));
    }

    #[test]
    fn test_final_report_prompt() {
        let sources = vec!["* A : https://a.com".to_string()];
        let prompt = ResearchPrompts::final_report("solar", "Summary text", &sources);
        assert!(prompt.starts_with(FINAL_REPORT_HEADING));
        assert!(prompt.contains("* A : https://a.com"));
        assert!(prompt.contains("Executive Summary"));
    }

    #[test]
    fn test_final_report_prompt_with_nothing_gathered() {
        let prompt = ResearchPrompts::final_report("solar", "", &[]);
        assert!(prompt.contains("(no research findings were gathered)"));
        assert!(prompt.contains("(no sources)"));
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 10), "héllo");
        assert_eq!(truncate_chars("héllo", 2), "hé...[truncated]");
    }
}
