use async_trait::async_trait;
use dialogue_flow::{CompletionClient, GenerationParams};
use rig::{client::CompletionClient as _, completion::Prompt, providers::openrouter};
use tracing::debug;

const CLINICAL_PREAMBLE: &str = "You are an AI clinical assistant supporting healthcare professionals.
Format your response in markdown:
- **Bold** for important terms and emphasis
- ### for section headers
- Bullet points for lists
- > for important warnings or notes
You are a support tool, not a replacement for clinical judgment. Flag emergencies and critical findings immediately.";

/// Completion client backed by an OpenRouter-hosted chat model.
pub struct OpenRouterCompletionClient {
    client: openrouter::Client,
    model: String,
}

impl OpenRouterCompletionClient {
    pub fn new(api_key: &str, model: impl Into<String>) -> Self {
        Self {
            client: openrouter::Client::new(api_key),
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenRouterCompletionClient {
    async fn complete(&self, prompt: &str, params: GenerationParams) -> anyhow::Result<String> {
        debug!(
            model = %self.model,
            temperature = params.temperature,
            max_tokens = params.max_tokens,
            prompt_length = prompt.len(),
            "Requesting completion"
        );

        let agent = self
            .client
            .agent(&self.model)
            .preamble(CLINICAL_PREAMBLE)
            .temperature(params.temperature)
            .max_tokens(params.max_tokens)
            .build();

        let response = agent.prompt(prompt.to_string()).await?;
        Ok(response)
    }
}
