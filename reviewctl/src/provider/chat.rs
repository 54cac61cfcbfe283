//! OpenAI-compatible chat-completions provider.
//!
//! Works against any `/chat/completions` endpoint; the default configuration
//! points at Gemini's OpenAI-compatible surface.

use std::time::Instant;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use super::parse::parse_analysis;
use super::prompt::{SYSTEM_PROMPT, build_user_prompt};
use super::{AnalysisContext, AnalysisOutcome, AnalysisProvider, ModelInfo, ProviderError, TokenUsage};
use crate::config::ProviderConfig;

/// Longest error body kept in [`ProviderError::Status`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionUsage {
    prompt_tokens: Option<i64>,
    completion_tokens: Option<i64>,
    total_tokens: Option<i64>,
}

pub struct ChatCompletionsProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    info: ModelInfo,
    temperature: f32,
    max_output_tokens: u32,
}

impl ChatCompletionsProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ProviderError::MissingApiKey)?
            .to_string();

        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.as_str().trim_end_matches('/')),
            api_key,
            info: ModelInfo {
                provider: config.name.clone(),
                version: config.model.clone(),
            },
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }
}

#[async_trait::async_trait]
impl AnalysisProvider for ChatCompletionsProvider {
    #[instrument(skip(self, text, context), fields(model = %self.info.version, chars = text.len()), err)]
    async fn analyze(&self, text: &str, context: &AnalysisContext) -> Result<AnalysisOutcome, ProviderError> {
        let payload = json!({
            "model": self.info.version,
            "temperature": self.temperature,
            "max_tokens": self.max_output_tokens,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_user_prompt(text, context) }
            ]
        });

        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
                body.truncate(cut);
            }
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let latency_ms = start.elapsed().as_millis() as i64;

        let content = completion
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?
            .message
            .content
            .unwrap_or_default();

        let usage = completion.usage.unwrap_or_default();
        let input_tokens = usage.prompt_tokens.unwrap_or(0).max(0);
        let output_tokens = usage.completion_tokens.unwrap_or(0).max(0);
        let total_tokens = usage.total_tokens.unwrap_or(0).max(0);

        debug!(latency_ms, input_tokens, output_tokens, "Provider call completed");

        Ok(AnalysisOutcome {
            review: parse_analysis(&content),
            usage: TokenUsage {
                input_tokens,
                output_tokens,
                total_tokens,
                latency_ms,
            },
        })
    }

    fn model_info(&self) -> ModelInfo {
        self.info.clone()
    }
}
