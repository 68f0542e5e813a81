//! # Deep Research
//!
//! An iterative research assistant. Given a topic it generates a search
//! query, retrieves web content, summarizes it, reflects on what is still
//! missing, repeats for a fixed number of loops, then writes a report.
//!
//! ```ignore
//! use deep_research::{Config, DeepResearcher, ResearchFocus};
//!
//! let config = Config::from_env()?;
//! config.validate()?;
//! let researcher = DeepResearcher::from_config(config)?;
//! let state = researcher.run("quantum batteries", ResearchFocus::default()).await?;
//! println!("{}", state.final_report);
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod search;
pub mod state;
pub mod steps;

pub use config::{Config, LlmProvider, SearchProvider};
pub use error::{ResearchError, Result, SearchApiError};
pub use llm::{GenerationOptions, LanguageModel, RigModel};
pub use orchestrator::{DeepResearcher, ResearchStage};
pub use prompts::ResearchPrompts;
pub use search::{DuckDuckGoSearch, SearchDepth, SearchResult, TavilySearch, WebSearch};
pub use state::{IterationRecord, ResearchFocus, ResearchState};
pub use steps::Reflection;
