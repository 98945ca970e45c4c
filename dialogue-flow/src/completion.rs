use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Sampling settings passed with every completion request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f64,
    pub max_tokens: u64,
}

impl GenerationParams {
    /// Conversational turns.
    pub const DIALOGUE: Self = Self {
        temperature: 0.7,
        max_tokens: 1024,
    };

    /// Short patient summaries.
    pub const SUMMARY: Self = Self {
        temperature: 0.3,
        max_tokens: 150,
    };

    /// Structured one-shot analyses (disease prediction, diagnosis analysis).
    pub const ANALYSIS: Self = Self {
        temperature: 0.3,
        max_tokens: 1024,
    };

    pub const RESEARCH: Self = Self {
        temperature: 0.7,
        max_tokens: 1000,
    };
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::DIALOGUE
    }
}

/// Text-completion service: prompt in, text out.
///
/// Implementations report transport problems as errors and may return an empty
/// string; the orchestrator normalizes both.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str, params: GenerationParams) -> anyhow::Result<String>;
}
