//! The boundary to the external text-generation service.
//!
//! The orchestrator depends on generation through the narrow
//! [`GenerationGateway`] trait only. The service is non-deterministic: the
//! same prompt may produce different text on every call, so nothing above
//! this boundary assumes idempotent output. The only structural guarantee is
//! a non-empty completion; anything else is surfaced as
//! [`GenerationUnavailable`] and is safe to retry.

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which of the three prompts a generation call is serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// The patient's session-opening line, built from the profile alone.
    Opening,
    /// A patient reply mid-dialogue, built from profile plus transcript.
    Continuation,
    /// The end-of-session performance critique of the trainee.
    Evaluation,
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptKind::Opening => write!(f, "opening"),
            PromptKind::Continuation => write!(f, "continuation"),
            PromptKind::Evaluation => write!(f, "evaluation"),
        }
    }
}

/// Failure of the generation service. Always retriable: the orchestrator
/// guarantees no session state was mutated when one of these surfaces.
#[derive(Debug, Error)]
pub enum GenerationUnavailable {
    #[error("generation request timed out after {0:?}")]
    Timeout(Duration),
    #[error("generation backend error: {0}")]
    Backend(#[from] anyhow::Error),
    #[error("generation backend returned an empty completion")]
    EmptyCompletion,
}

/// Sampling parameters applied to every generation request.
///
/// The defaults favor varied, in-character patient speech over terse
/// deterministic output.
#[derive(Debug, Clone, Copy)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.9,
            top_p: 0.95,
            max_tokens: 300,
        }
    }
}

/// A request/response client for the text-generation service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Generates text for an already-rendered prompt.
    ///
    /// Returns the completion, or [`GenerationUnavailable`] on transport,
    /// timeout, quota, or empty-completion failures.
    async fn generate(
        &self,
        kind: PromptKind,
        prompt: &str,
    ) -> Result<String, GenerationUnavailable>;
}

/// A [`GenerationGateway`] backed by any OpenAI-compatible chat-completions
/// endpoint (OpenAI proper, or Gemini's compatibility endpoint).
pub struct OpenAiCompatGateway {
    client: Client<OpenAIConfig>,
    model: String,
    sampling: SamplingParams,
    timeout: Duration,
}

impl OpenAiCompatGateway {
    /// Creates a new gateway.
    ///
    /// # Arguments
    ///
    /// * `config` - API key and base URL for the backend.
    /// * `model` - Chat model identifier, e.g. "gpt-4o" or "gemini-2.0-flash".
    /// * `timeout` - Upper bound on each request; exceeding it surfaces
    ///   [`GenerationUnavailable::Timeout`] with no state mutated.
    pub fn new(config: OpenAIConfig, model: String, timeout: Duration) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            sampling: SamplingParams::default(),
            timeout,
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }
}

#[async_trait]
impl GenerationGateway for OpenAiCompatGateway {
    async fn generate(
        &self,
        _kind: PromptKind,
        prompt: &str,
    ) -> Result<String, GenerationUnavailable> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.sampling.temperature)
            .top_p(self.sampling.top_p)
            .max_tokens(self.sampling.max_tokens)
            .messages(vec![
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()
                    .map_err(|e| GenerationUnavailable::Backend(e.into()))?
                    .into(),
            ])
            .build()
            .map_err(|e| GenerationUnavailable::Backend(e.into()))?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| GenerationUnavailable::Timeout(self.timeout))?
            .map_err(|e| GenerationUnavailable::Backend(e.into()))?;

        let text = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(GenerationUnavailable::EmptyCompletion)?;

        Ok(text.to_string())
    }
}

/// A deterministic in-process gateway for development and integration
/// testing, with no external dependency or API cost.
pub struct CannedGateway;

#[async_trait]
impl GenerationGateway for CannedGateway {
    async fn generate(
        &self,
        kind: PromptKind,
        _prompt: &str,
    ) -> Result<String, GenerationUnavailable> {
        let text = match kind {
            PromptKind::Opening => {
                "I don't really know where to start... my chest has been tight all week \
                 and I keep feeling anxious for no reason I can name."
            }
            PromptKind::Continuation => {
                "Maybe... it got worse after I stopped sleeping properly. My hands \
                 tremble sometimes and I feel embarrassed even saying that."
            }
            PromptKind::Evaluation => {
                "The student built rapport early and used open questions well. \
                 Reflective listening could be applied more consistently, and the \
                 closing lacked a summary of agreed next steps."
            }
        };
        Ok(text.to_string())
    }
}
