//! # Configuration Module
//!
//! Loads the process-wide research configuration once at startup.
//! Values come from defaults, then environment variables (optionally from a
//! `.env` file), then CLI overrides applied by the binary. After
//! `validate()` the struct is passed by value into the clients and the
//! orchestrator and never re-read from the environment.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ResearchError, Result};
use crate::search::{SearchDepth, TAVILY_MAX_QUERY_CHARS};

/// Upper bound on research iterations accepted by `validate()`.
pub const MAX_ALLOWED_LOOPS: usize = 10;

// =============================================================================
// PROVIDER SELECTION
// =============================================================================
/// Which inference backend serves the language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// Local models through an Ollama server
    #[default]
    Ollama,
    /// OpenAI chat completions
    OpenAi,
}

impl FromStr for LlmProvider {
    type Err = ResearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => Err(ResearchError::Configuration(format!(
                "unknown LLM provider '{}' (expected 'ollama' or 'openai')",
                other
            ))),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::OpenAi => write!(f, "openai"),
        }
    }
}

/// Which web search backend serves queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchProvider {
    /// Tavily Search API (requires TAVILY_API_KEY)
    #[default]
    Tavily,
    /// DuckDuckGo HTML endpoint, no key required
    DuckDuckGo,
}

impl FromStr for SearchProvider {
    type Err = ResearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tavily" => Ok(Self::Tavily),
            "duckduckgo" | "ddg" => Ok(Self::DuckDuckGo),
            other => Err(ResearchError::Configuration(format!(
                "unknown search provider '{}' (expected 'tavily' or 'duckduckgo')",
                other
            ))),
        }
    }
}

impl fmt::Display for SearchProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tavily => write!(f, "tavily"),
            Self::DuckDuckGo => write!(f, "duckduckgo"),
        }
    }
}

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Main configuration for a research run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Inference backend
    pub llm_provider: LlmProvider,

    /// Model identifier passed to every generation call
    pub model: String,

    /// Ollama server URL (default: http://localhost:11434)
    pub ollama_host: String,

    /// OpenAI key, required when `llm_provider` is OpenAI
    pub openai_api_key: Option<String>,

    /// Search backend
    pub search_provider: SearchProvider,

    /// Tavily key, required when `search_provider` is Tavily
    pub tavily_api_key: Option<String>,

    /// Number of query → search → summarize → reflect cycles
    pub max_loops: usize,

    /// Temperature for summarization and the final report
    pub temperature: f64,

    /// Token cap for summarization and the final report
    pub max_tokens: u64,

    /// Maximum number of search results per query
    pub max_search_results: usize,

    /// Tavily search depth
    pub search_depth: SearchDepth,

    /// Generated queries are clamped to this many characters
    pub max_query_length: usize,

    /// Each source's content is truncated to this many characters in prompts
    pub max_source_chars: usize,

    /// HTTP timeout for a single search request
    pub search_timeout: Duration,

    /// Retries on transient search failures (0 disables retrying)
    pub search_max_retries: u32,

    /// Log level for the application
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_provider: LlmProvider::Ollama,
            model: "llama3.2".to_string(),
            ollama_host: "http://localhost:11434".to_string(),
            openai_api_key: None,
            search_provider: SearchProvider::Tavily,
            tavily_api_key: None,
            max_loops: 3,
            temperature: 0.7,
            max_tokens: 2048,
            max_search_results: 5,
            search_depth: SearchDepth::Basic,
            max_query_length: 400,
            max_source_chars: 2000,
            search_timeout: Duration::from_secs(30),
            search_max_retries: 0,
            log_level: "info".to_string(),
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Config {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// `from_env` is a thin wrapper over this; tests pass a closure over a
    /// map instead of touching the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(val) = lookup("LLM_PROVIDER") {
            config.llm_provider = val.parse()?;
        }

        // LLM_MODEL wins over the older OLLAMA_MODEL name
        if let Some(val) = lookup("LLM_MODEL").or_else(|| lookup("OLLAMA_MODEL")) {
            config.model = val;
        }

        if let Some(val) = lookup("OLLAMA_API_BASE_URL") {
            config.ollama_host = val;
        }

        config.openai_api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());

        if let Some(val) = lookup("SEARCH_PROVIDER") {
            config.search_provider = val.parse()?;
        }

        config.tavily_api_key = lookup("TAVILY_API_KEY").filter(|k| !k.trim().is_empty());

        if let Some(val) = lookup("MAX_LOOPS") {
            config.max_loops = parse_var("MAX_LOOPS", &val)?;
        }

        if let Some(val) = lookup("TEMPERATURE") {
            config.temperature = parse_var("TEMPERATURE", &val)?;
        }

        if let Some(val) = lookup("MAX_TOKENS") {
            config.max_tokens = parse_var("MAX_TOKENS", &val)?;
        }

        if let Some(val) = lookup("MAX_SEARCH_RESULTS") {
            config.max_search_results = parse_var("MAX_SEARCH_RESULTS", &val)?;
        }

        if let Some(val) = lookup("SEARCH_DEPTH") {
            config.search_depth = val.parse()?;
        }

        if let Some(val) = lookup("MAX_QUERY_LENGTH") {
            config.max_query_length = parse_var("MAX_QUERY_LENGTH", &val)?;
        }

        if let Some(val) = lookup("MAX_SOURCE_CHARS") {
            config.max_source_chars = parse_var("MAX_SOURCE_CHARS", &val)?;
        }

        if let Some(val) = lookup("SEARCH_TIMEOUT_SECS") {
            config.search_timeout = Duration::from_secs(parse_var("SEARCH_TIMEOUT_SECS", &val)?);
        }

        if let Some(val) = lookup("SEARCH_MAX_RETRIES") {
            config.search_max_retries = parse_var("SEARCH_MAX_RETRIES", &val)?;
        }

        if let Some(val) = lookup("RUST_LOG") {
            config.log_level = val;
        }

        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Fails fast with a `Configuration` error before any network call.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ResearchError::Configuration(format!(
                "TEMPERATURE must be between 0.0 and 2.0, got: {}",
                self.temperature
            )));
        }

        if !(1..=20).contains(&self.max_search_results) {
            return Err(ResearchError::Configuration(format!(
                "MAX_SEARCH_RESULTS must be between 1 and 20, got: {}",
                self.max_search_results
            )));
        }

        if self.max_loops > MAX_ALLOWED_LOOPS {
            return Err(ResearchError::Configuration(format!(
                "MAX_LOOPS must be at most {}, got: {}",
                MAX_ALLOWED_LOOPS, self.max_loops
            )));
        }

        if self.model.trim().is_empty() {
            return Err(ResearchError::Configuration(
                "LLM_MODEL cannot be empty".to_string(),
            ));
        }

        if self.max_query_length == 0 || self.max_source_chars == 0 {
            return Err(ResearchError::Configuration(
                "MAX_QUERY_LENGTH and MAX_SOURCE_CHARS must be at least 1".to_string(),
            ));
        }

        if self.search_provider == SearchProvider::Tavily
            && self.max_query_length > TAVILY_MAX_QUERY_CHARS
        {
            return Err(ResearchError::Configuration(format!(
                "MAX_QUERY_LENGTH must be at most {} with Tavily search, got: {}",
                TAVILY_MAX_QUERY_CHARS, self.max_query_length
            )));
        }

        if self.llm_provider == LlmProvider::OpenAi && self.openai_api_key.is_none() {
            return Err(ResearchError::Configuration(
                "OPENAI_API_KEY environment variable not set".to_string(),
            ));
        }

        if self.search_provider == SearchProvider::Tavily && self.tavily_api_key.is_none() {
            return Err(ResearchError::Configuration(
                "TAVILY_API_KEY environment variable not set".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse a single environment value, naming the variable on failure.
fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e| {
        ResearchError::Configuration(format!("{} has an invalid value '{}': {}", name, raw, e))
    })
}
