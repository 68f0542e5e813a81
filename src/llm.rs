//! # Language Model Module
//!
//! The text-generation capability used by every research step, and a
//! Rig-backed implementation that talks to either Ollama or OpenAI.

use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::{ollama, openai};
use tracing::debug;

use crate::config::{Config, LlmProvider};
use crate::error::{ResearchError, Result};

// =============================================================================
// GENERATION OPTIONS
// =============================================================================
/// Per-call sampling settings.
///
/// Each research step picks its own temperature; `None` leaves the
/// provider default in place.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationOptions {
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: Option<f64>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u64>,
}

impl GenerationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

// =============================================================================
// LANGUAGE MODEL CAPABILITY
// =============================================================================
/// Sends a prompt to an inference endpoint and returns the generated text.
///
/// Unreachable endpoints and provider failures come back as
/// [`ResearchError::ModelUnavailable`]. An empty or degenerate completion is
/// *not* an error at this layer; callers receive it unchanged.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate with explicit sampling options.
    async fn generate_with(
        &self,
        prompt: &str,
        model: &str,
        options: &GenerationOptions,
    ) -> Result<String>;

    /// Generate with provider defaults.
    async fn generate(&self, prompt: &str, model: &str) -> Result<String> {
        self.generate_with(prompt, model, &GenerationOptions::default())
            .await
    }
}

// =============================================================================
// RIG-BACKED MODEL
// =============================================================================
enum RigClient {
    Ollama(ollama::Client),
    OpenAi(openai::Client),
}

/// Language model served through Rig's provider clients.
///
/// A fresh Rig agent is built per call so that each step can carry its own
/// temperature and token cap.
pub struct RigModel {
    client: RigClient,
}

impl RigModel {
    /// Build the client for the provider selected in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = match config.llm_provider {
            LlmProvider::Ollama => {
                // Rig's Ollama client reads its base URL from this variable
                std::env::set_var("OLLAMA_API_BASE_URL", &config.ollama_host);
                debug!(host = %config.ollama_host, "Creating Ollama client");
                RigClient::Ollama(ollama::Client::from_env())
            }
            LlmProvider::OpenAi => {
                let api_key = config.openai_api_key.clone().ok_or_else(|| {
                    ResearchError::Configuration(
                        "OPENAI_API_KEY environment variable not set".to_string(),
                    )
                })?;
                debug!("Creating OpenAI client");
                RigClient::OpenAi(openai::Client::from_val(api_key.into()))
            }
        };

        Ok(Self { client })
    }

    pub fn provider_name(&self) -> &'static str {
        match self.client {
            RigClient::Ollama(_) => "ollama",
            RigClient::OpenAi(_) => "openai",
        }
    }
}

#[async_trait]
impl LanguageModel for RigModel {
    async fn generate_with(
        &self,
        prompt: &str,
        model: &str,
        options: &GenerationOptions,
    ) -> Result<String> {
        debug!(
            provider = self.provider_name(),
            model = %model,
            prompt_chars = prompt.len(),
            "Sending prompt"
        );

        let response = match &self.client {
            RigClient::Ollama(client) => {
                let mut builder = client.agent(model);
                if let Some(temperature) = options.temperature {
                    builder = builder.temperature(temperature);
                }
                if let Some(max_tokens) = options.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }
                builder.build().prompt(prompt).await
            }
            RigClient::OpenAi(client) => {
                let mut builder = client.agent(model);
                if let Some(temperature) = options.temperature {
                    builder = builder.temperature(temperature);
                }
                if let Some(max_tokens) = options.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }
                builder.build().prompt(prompt).await
            }
        };

        response.map_err(|e| {
            ResearchError::ModelUnavailable(format!(
                "{} completion failed: {}",
                self.provider_name(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoModel;

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn generate_with(
            &self,
            prompt: &str,
            model: &str,
            options: &GenerationOptions,
        ) -> Result<String> {
            Ok(format!("{}|{}|{:?}", model, prompt, options.temperature))
        }
    }

    #[test]
    fn test_generation_options_builder() {
        let options = GenerationOptions::new()
            .with_temperature(0.4)
            .with_max_tokens(200);

        assert_eq!(options.temperature, Some(0.4));
        assert_eq!(options.max_tokens, Some(200));
        assert_eq!(GenerationOptions::default().temperature, None);
    }

    #[tokio::test]
    async fn test_generate_uses_default_options() {
        let out = EchoModel.generate("hello", "m1").await.unwrap();
        assert_eq!(out, "m1|hello|None");
    }

    #[test]
    fn test_rig_model_is_language_model() {
        fn assert_model<T: LanguageModel>() {}
        assert_model::<RigModel>();
    }

    #[test]
    fn test_openai_without_key_is_configuration_error() {
        let config = Config {
            llm_provider: LlmProvider::OpenAi,
            openai_api_key: None,
            ..Config::default()
        };
        assert!(matches!(
            RigModel::from_config(&config),
            Err(ResearchError::Configuration(_))
        ));
    }

    #[tokio::test]
    #[ignore] // Requires a running Ollama server with llama3.2 pulled
    async fn test_ollama_generate_live() {
        let model = RigModel::from_config(&Config::default()).unwrap();
        let out = model
            .generate("Say 'hello' and nothing else.", "llama3.2")
            .await
            .unwrap();
        assert!(out.to_lowercase().contains("hello"));
    }
}
