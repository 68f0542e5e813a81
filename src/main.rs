//! # Deep Research CLI
//!
//! Runs the iterative research loop on one topic and prints what each
//! stage produced, ending with the final report.
//!
//! ## Quick Start
//! ```bash
//! ollama pull llama3.2
//! TAVILY_API_KEY=tvly-... deep-research "quantum batteries"
//! deep-research --search duckduckgo --max-loops 2 "solid state batteries"
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use deep_research::{
    Config, DeepResearcher, LlmProvider, ResearchError, ResearchFocus, ResearchState,
    SearchApiError, SearchProvider,
};

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "deep-research",
    version,
    about = "Iterative web research: query, search, summarize, reflect, report",
    long_about = r#"
Deep Research - iterative research on any topic.

For a fixed number of loops it will:
  1. Write a focused web search query
  2. Search the web (Tavily or DuckDuckGo)
  3. Fold the results into a running summary
  4. Reflect on knowledge gaps and pick the next query
Then it writes a structured final report with sources.

PREREQUISITES:
  Ollama running locally (ollama serve) with a model pulled, or OPENAI_API_KEY.
  TAVILY_API_KEY for Tavily search (or use --search duckduckgo).

EXAMPLES:
  deep-research "quantum batteries"
  deep-research --max-loops 1 --company Tesla --metrics "market share,growth rate" "EV batteries"
  deep-research --provider openai --model gpt-4o-mini --output report.md "grid storage"
"#
)]
struct Args {
    /// The topic to research
    #[arg(value_name = "TOPIC")]
    topic: String,

    /// Model name passed to the provider
    #[arg(short = 'm', long = "model", env = "LLM_MODEL")]
    model: Option<String>,

    /// LLM provider: ollama or openai
    #[arg(short = 'p', long = "provider")]
    provider: Option<LlmProvider>,

    /// Search backend: tavily or duckduckgo
    #[arg(short = 's', long = "search")]
    search: Option<SearchProvider>,

    /// Number of research loops (0-10)
    #[arg(short = 'l', long = "max-loops")]
    max_loops: Option<usize>,

    /// Company to focus the research on
    #[arg(long = "company")]
    company: Option<String>,

    /// Comma-separated metrics to analyze
    #[arg(long = "metrics", value_delimiter = ',')]
    metrics: Vec<String>,

    /// Analysis method, e.g. "SWOT analysis"
    #[arg(long = "method")]
    method: Option<String>,

    /// Print the full research state as JSON instead of text
    #[arg(long = "json", default_value = "false")]
    json: bool,

    /// Also write the final report to this file
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", default_value = "false")]
    verbose: bool,
}

impl Args {
    fn focus(&self) -> ResearchFocus {
        ResearchFocus {
            company: non_blank(self.company.as_deref()),
            metrics: self
                .metrics
                .iter()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
            analysis_method: non_blank(self.method.as_deref()),
        }
    }

    /// Apply command-line overrides on top of the environment config.
    fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(provider) = self.provider {
            config.llm_provider = provider;
        }
        if let Some(search) = self.search {
            config.search_provider = search;
        }
        if let Some(max_loops) = self.max_loops {
            config.max_loops = max_loops;
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =============================================================================
// MAIN
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    init_logging(args.verbose, &config.log_level)?;

    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(
        provider = %config.llm_provider,
        model = %config.model,
        search = %config.search_provider,
        max_loops = config.max_loops,
        "Configuration loaded"
    );

    let researcher = DeepResearcher::from_config(config)?;

    let state = match researcher.run(&args.topic, args.focus()).await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Research failed");
            eprintln!("\nResearch failed: {}", e);
            if let Some(hint) = failure_hint(&e) {
                eprintln!("\nTip: {}", hint);
            }
            return Err(e.into());
        }
    };

    if let Some(path) = &args.output {
        fs::write(path, render_report_file(&state))
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Report saved");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        println!("{}", render_state(&state));
    }

    Ok(())
}

// =============================================================================
// LOGGING
// =============================================================================
/// Logs go to stderr so stdout carries only the research output.
///
/// `--verbose` forces debug; otherwise `RUST_LOG` (or the configured
/// level) decides.
fn init_logging(verbose: bool, default_level: &str) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}

fn failure_hint(error: &ResearchError) -> Option<&'static str> {
    match error {
        ResearchError::ModelUnavailable(msg) if msg.contains("onnect") => {
            Some("make sure Ollama is running: ollama serve")
        }
        ResearchError::ModelUnavailable(_) => {
            Some("make sure the model is installed: ollama pull llama3.2")
        }
        ResearchError::SearchApi(SearchApiError::Unauthorized) => {
            Some("check TAVILY_API_KEY, or try --search duckduckgo")
        }
        ResearchError::SearchApi(SearchApiError::RateLimited) => {
            Some("the search provider is rate limiting; wait a minute and retry")
        }
        ResearchError::EmptyResult { .. } => {
            Some("try a broader topic or a different --search backend")
        }
        _ => None,
    }
}

// =============================================================================
// OUTPUT
// =============================================================================
const RULE_WIDTH: usize = 60;

/// Text rendering: queries, sources, summary, reflection, final report.
fn render_state(state: &ResearchState) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    out.push_str(&format!("\n{}\nDEEP RESEARCH: {}\n{}\n", rule, state.topic, rule));

    out.push_str("\n## Search Queries\n\n");
    if state.iterations.is_empty() {
        out.push_str("(no research loops were run)\n");
    }
    for record in &state.iterations {
        out.push_str(&format!(
            "{}. {} ({} results)\n",
            record.iteration, record.query, record.sources_found
        ));
        for gap in &record.knowledge_gaps {
            out.push_str(&format!("   - gap: {}\n", gap));
        }
    }

    out.push_str("\n## Sources\n\n");
    if state.sources_gathered.is_empty() {
        out.push_str("(none)\n");
    } else {
        out.push_str(&state.sources_gathered.join("\n"));
        out.push('\n');
    }

    out.push_str("\n## Running Summary\n\n");
    out.push_str(if state.running_summary.is_empty() {
        "(empty)"
    } else {
        state.running_summary.as_str()
    });
    out.push('\n');

    if !state.follow_up_query.is_empty() {
        out.push_str(&format!("\n## Reflection\n\nFollow-up query: {}\n", state.follow_up_query));
    }

    out.push_str(&format!("\n{}\nFINAL REPORT\n{}\n\n", rule, rule));
    out.push_str(&state.final_report);
    out.push_str(&format!(
        "\n\n{}\n{} words, {} sources, {} loops\n",
        rule,
        state.report_word_count(),
        state.sources_gathered.len(),
        state.loop_count
    ));

    out
}

/// Markdown written by `--output`.
fn render_report_file(state: &ResearchState) -> String {
    format!(
        "# {}\n\n_Generated {}_\n\n{}\n",
        state.topic,
        chrono::Utc::now().format("%Y-%m-%d %H:%M UTC"),
        state.final_report
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use deep_research::IterationRecord;

    fn finished_state() -> ResearchState {
        let mut state = ResearchState::new("quantum batteries", ResearchFocus::default());
        state.loop_count = 1;
        state.iterations.push(IterationRecord {
            iteration: 1,
            query: "quantum battery research".to_string(),
            sources_found: 2,
            knowledge_gaps: vec!["No cost data".to_string()],
            follow_up_query: "quantum battery cost".to_string(),
        });
        state.sources_gathered = vec!["* A : https://a.com".to_string()];
        state.running_summary = "Quantum batteries charge fast.".to_string();
        state.follow_up_query = "quantum battery cost".to_string();
        state.final_report = "## Executive Summary\nPromising.".to_string();
        state
    }

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["test", "quantum batteries"]);
        assert_eq!(args.topic, "quantum batteries");
        assert!(args.provider.is_none());
        assert!(args.max_loops.is_none());
        assert!(!args.json);
        assert!(!args.verbose);
        assert!(args.focus().is_empty());
    }

    #[test]
    fn test_args_with_flags() {
        let args = Args::parse_from([
            "test",
            "--provider", "openai",
            "--search", "ddg",
            "--max-loops", "2",
            "--company", "Tesla",
            "--metrics", "market share, growth rate",
            "--method", "SWOT analysis",
            "--json",
            "-v",
            "EV batteries",
        ]);

        assert_eq!(args.topic, "EV batteries");
        assert_eq!(args.provider, Some(LlmProvider::OpenAi));
        assert_eq!(args.search, Some(SearchProvider::DuckDuckGo));
        assert!(args.json);
        assert!(args.verbose);

        let focus = args.focus();
        assert_eq!(focus.company.as_deref(), Some("Tesla"));
        assert_eq!(focus.metrics, vec!["market share", "growth rate"]);
        assert_eq!(focus.analysis_method.as_deref(), Some("SWOT analysis"));

        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.max_loops, 2);
        assert_eq!(config.llm_provider, LlmProvider::OpenAi);
        assert_eq!(config.search_provider, SearchProvider::DuckDuckGo);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!(Args::try_parse_from(["test", "--provider", "bard", "topic"]).is_err());
    }

    #[test]
    fn test_render_state_section_order() {
        let out = render_state(&finished_state());

        let positions: Vec<usize> = [
            "## Search Queries",
            "## Sources",
            "## Running Summary",
            "## Reflection",
            "FINAL REPORT",
        ]
        .iter()
        .map(|heading| out.find(heading).unwrap())
        .collect();

        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(out.contains("1. quantum battery research (2 results)"));
        assert!(out.contains("gap: No cost data"));
        assert!(out.contains("Follow-up query: quantum battery cost"));
    }

    #[test]
    fn test_render_state_without_loops() {
        let mut state = ResearchState::new("t", ResearchFocus::default());
        state.final_report = "Nothing found.".to_string();
        let out = render_state(&state);
        assert!(out.contains("(no research loops were run)"));
        assert!(out.contains("(empty)"));
        assert!(!out.contains("## Reflection"));
    }

    #[test]
    fn test_report_file_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");

        fs::write(&path, render_report_file(&finished_state())).unwrap();

        let saved = fs::read_to_string(&path).unwrap();
        assert!(saved.starts_with("# quantum batteries"));
        assert!(saved.contains("## Executive Summary"));
    }

    #[test]
    fn test_failure_hints() {
        let err = ResearchError::ModelUnavailable("Connection refused".to_string());
        assert!(failure_hint(&err).unwrap().contains("ollama serve"));
        let err = ResearchError::EmptyResult { query: "q".to_string() };
        assert!(failure_hint(&err).is_some());
        assert!(failure_hint(&ResearchError::Configuration("x".to_string())).is_none());
    }
}
