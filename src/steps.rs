//! Research step functions
//!
//! Each step pairs one prompt template with one language-model call. None
//! of them touch `ResearchState`; the orchestrator stores what they return.

use tracing::{debug, warn};

use crate::config::Config;
use crate::llm::{GenerationOptions, LanguageModel};
use crate::prompts::{ResearchPrompts, FOLLOW_UP_LABEL};
use crate::search::SearchResult;
use crate::error::{ResearchError, Result};
use crate::state::ResearchFocus;

/// Query generation runs cool and short
const QUERY_TEMPERATURE: f64 = 0.4;
const QUERY_MAX_TOKENS: u64 = 200;

/// Gap analysis runs cooler still
const REFLECTION_TEMPERATURE: f64 = 0.3;
const REFLECTION_MAX_TOKENS: u64 = 300;

/// Output of the reflection step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reflection {
    /// Gaps the model listed, in order
    pub knowledge_gaps: Vec<String>,
    /// Query to search next
    pub follow_up_query: String,
}

/// Ask the model for a single focused search query.
///
/// The response is tidied by [`clean_query`]; an empty response stays empty.
pub async fn generate_query(
    llm: &dyn LanguageModel,
    config: &Config,
    topic: &str,
    focus: &ResearchFocus,
    running_summary: &str,
) -> Result<String> {
    let prompt =
        ResearchPrompts::query_writer(topic, focus, running_summary, config.max_query_length);
    let options = GenerationOptions::new()
        .with_temperature(QUERY_TEMPERATURE)
        .with_max_tokens(QUERY_MAX_TOKENS);

    let raw = llm.generate_with(&prompt, &config.model, &options).await?;
    let query = clean_query(&raw, config.max_query_length);

    if query.is_empty() {
        warn!(topic = %topic, "Model returned an empty search query");
    }
    debug!(query = %query, "Generated search query");
    Ok(query)
}

/// Fold new search results into an updated summary.
///
/// An empty completion is a model failure: the results were there to
/// summarize.
pub async fn summarize_sources(
    llm: &dyn LanguageModel,
    config: &Config,
    topic: &str,
    focus: &ResearchFocus,
    running_summary: &str,
    results: &[SearchResult],
) -> Result<String> {
    let prompt = ResearchPrompts::summarizer(
        topic,
        focus,
        running_summary,
        results,
        config.max_source_chars,
    );
    let options = GenerationOptions::new()
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens);

    let summary = llm.generate_with(&prompt, &config.model, &options).await?;
    let summary = summary.trim();
    if summary.is_empty() {
        return Err(ResearchError::ModelUnavailable(format!(
            "empty summary returned by model '{}'",
            config.model
        )));
    }
    debug!(chars = summary.len(), sources = results.len(), "Summarized sources");
    Ok(summary.to_string())
}

/// Critique the summary and propose the next search.
pub async fn reflect_on_summary(
    llm: &dyn LanguageModel,
    config: &Config,
    topic: &str,
    running_summary: &str,
) -> Result<Reflection> {
    let prompt = ResearchPrompts::reflection(topic, running_summary);
    let options = GenerationOptions::new()
        .with_temperature(REFLECTION_TEMPERATURE)
        .with_max_tokens(REFLECTION_MAX_TOKENS);

    let raw = llm.generate_with(&prompt, &config.model, &options).await?;
    let reflection = parse_reflection(&raw, config.max_query_length);
    debug!(
        gaps = reflection.knowledge_gaps.len(),
        follow_up = %reflection.follow_up_query,
        "Reflected on summary"
    );
    Ok(reflection)
}

/// Write the final structured report.
pub async fn finalize_summary(
    llm: &dyn LanguageModel,
    config: &Config,
    topic: &str,
    running_summary: &str,
    sources_gathered: &[String],
) -> Result<String> {
    let prompt = ResearchPrompts::final_report(topic, running_summary, sources_gathered);
    let options = GenerationOptions::new()
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens);

    let report = llm.generate_with(&prompt, &config.model, &options).await?;
    Ok(report.trim().to_string())
}

/// Tidy a model-written query: first non-blank line, no label, no wrapping
/// quotes, at most `max_chars` characters.
pub fn clean_query(raw: &str, max_chars: usize) -> String {
    let line = raw
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");

    let line = strip_label(line, "query:");
    let line = line
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
        .trim();

    line.chars().take(max_chars).collect::<String>().trim_end().to_string()
}

/// Split a reflection response into gaps and a follow-up query.
///
/// Bulleted or numbered lines become gaps. The line carrying
/// [`FOLLOW_UP_LABEL`] supplies the query; without one, the first gap is
/// used, and with no gaps either, the whole trimmed response.
pub fn parse_reflection(raw: &str, max_query_chars: usize) -> Reflection {
    let mut knowledge_gaps = Vec::new();
    let mut follow_up = None;

    let label = FOLLOW_UP_LABEL.to_ascii_lowercase();
    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let bare = strip_list_marker(line);
        if bare.to_ascii_lowercase().starts_with(&label) {
            follow_up = Some(clean_query(&bare[FOLLOW_UP_LABEL.len()..], max_query_chars));
        } else if bare.len() != line.len() {
            knowledge_gaps.push(bare.to_string());
        }
    }

    let follow_up_query = match (follow_up, knowledge_gaps.first()) {
        (Some(q), _) if !q.is_empty() => q,
        (_, Some(gap)) => clean_query(gap, max_query_chars),
        _ => clean_query(&raw.trim().replace('\n', " "), max_query_chars),
    };

    Reflection {
        knowledge_gaps,
        follow_up_query,
    }
}

/// Drop a leading `-`, `*`, `•` or `1.` / `1)` marker.
fn strip_list_marker(line: &str) -> &str {
    if let Some(rest) = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("• "))
    {
        return rest.trim();
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim();
        }
    }

    line
}

/// Remove a case-insensitive `label` prefix (e.g. `Query:`).
fn strip_label<'a>(line: &'a str, label: &str) -> &'a str {
    match line.get(..label.len()) {
        Some(head) if head.eq_ignore_ascii_case(label) => line[label.len()..].trim(),
        _ => line,
    }
}
