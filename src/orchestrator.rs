//! # Research Orchestrator
//!
//! Drives a fixed number of research iterations and then writes the report:
//!
//! ```text
//! INIT → QUERY → SEARCH → SUMMARIZE → REFLECT ─┬─ loop_count < max_loops ─→ SEARCH
//!                                              └─ otherwise ──────────────→ FINALIZE → DONE
//! ```
//!
//! `generate_query` runs once, on the first iteration. After that, the
//! reflection's follow-up query is searched directly. Any error aborts the
//! run; there is no partial report.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{ResearchError, Result};
use crate::llm::{LanguageModel, RigModel};
use crate::search::{self, WebSearch};
use crate::state::{IterationRecord, ResearchFocus, ResearchState};
use crate::steps;

/// Stages of a research run, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchStage {
    Init,
    Query,
    Search,
    Summarize,
    Reflect,
    Finalize,
    Done,
}

impl fmt::Display for ResearchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Query => "query",
            Self::Search => "search",
            Self::Summarize => "summarize",
            Self::Reflect => "reflect",
            Self::Finalize => "finalize",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Runs the query → search → summarize → reflect loop.
///
/// Holds only read-only collaborators, so one instance can serve several
/// runs; each run owns its own [`ResearchState`].
pub struct DeepResearcher {
    config: Config,
    llm: Arc<dyn LanguageModel>,
    search: Arc<dyn WebSearch>,
}

impl DeepResearcher {
    pub fn new(config: Config, llm: Arc<dyn LanguageModel>, search: Arc<dyn WebSearch>) -> Self {
        Self {
            config,
            llm,
            search,
        }
    }

    /// Build the Rig model and search backend named in `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        let llm: Arc<dyn LanguageModel> = Arc::new(RigModel::from_config(&config)?);
        let search = search::from_config(&config)?;
        Ok(Self::new(config, llm, search))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Research `topic` and return the finished state.
    pub async fn run(&self, topic: &str, focus: ResearchFocus) -> Result<ResearchState> {
        let max_loops = self.config.max_loops;
        let mut state = ResearchState::new(topic, focus);
        info!(topic = %topic, max_loops, stage = %ResearchStage::Init, "Starting deep research");

        while state.loop_count < max_loops {
            let iteration = state.loop_count + 1;

            if state.loop_count == 0 {
                info!(iteration, stage = %ResearchStage::Query, "Generating search query");
                state.search_query = steps::generate_query(
                    self.llm.as_ref(),
                    &self.config,
                    &state.topic,
                    &state.focus,
                    &state.running_summary,
                )
                .await?;
            }

            info!(iteration, stage = %ResearchStage::Search, query = %state.search_query, "Searching");
            let results = self.search.search(&state.search_query).await?;
            if results.is_empty() {
                warn!(query = %state.search_query, "Search returned no documents");
                return Err(ResearchError::EmptyResult {
                    query: state.search_query.clone(),
                });
            }
            let sources_found = results.len();
            let new_sources = state.record_search_results(results);
            info!(
                iteration,
                sources_found,
                new_sources,
                total_sources = state.sources_gathered.len(),
                "Collected sources"
            );

            info!(iteration, stage = %ResearchStage::Summarize, "Summarizing sources");
            let summary = steps::summarize_sources(
                self.llm.as_ref(),
                &self.config,
                &state.topic,
                &state.focus,
                &state.running_summary,
                &state.search_results,
            )
            .await?;
            state.merge_summary(&summary);

            info!(iteration, stage = %ResearchStage::Reflect, "Reflecting on summary");
            let reflection = steps::reflect_on_summary(
                self.llm.as_ref(),
                &self.config,
                &state.topic,
                &state.running_summary,
            )
            .await?;

            state.iterations.push(IterationRecord {
                iteration,
                query: state.search_query.clone(),
                sources_found,
                knowledge_gaps: reflection.knowledge_gaps.clone(),
                follow_up_query: reflection.follow_up_query.clone(),
            });
            state.knowledge_gaps = reflection.knowledge_gaps;
            state.follow_up_query = reflection.follow_up_query;
            state.loop_count += 1;

            if state.loop_count < max_loops {
                state.search_query = state.follow_up_query.clone();
            }
        }

        info!(stage = %ResearchStage::Finalize, loops = state.loop_count, "Writing final report");
        state.final_report = steps::finalize_summary(
            self.llm.as_ref(),
            &self.config,
            &state.topic,
            &state.running_summary,
            &state.sources_gathered,
        )
        .await?;

        info!(
            stage = %ResearchStage::Done,
            sources = state.sources_gathered.len(),
            report_words = state.report_word_count(),
            "Research completed"
        );
        Ok(state)
    }
}
