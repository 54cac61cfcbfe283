//! Language-model integration producing structured review analyses.
//!
//! ```text
//!   raw text + language hint
//!            │
//!            ▼
//!   ┌──────────────────┐  POST {base_url}/chat/completions  ┌──────────────┐
//!   │ AnalysisProvider │ ─────────────────────────────────► │  LLM backend │
//!   └──────────────────┘ ◄───────────────────────────────── └──────────────┘
//!            │              content + usage
//!            ▼
//!   parse::parse_analysis  (fence stripping, field defaults, fallback)
//!            │
//!            ▼
//!   AnalysisOutcome { review, usage }
//! ```
//!
//! Two failure classes stay distinct:
//!
//! - Output that cannot be parsed is *not* an error. [`parse::parse_analysis`]
//!   substitutes a deterministic fallback and the call still succeeds.
//! - Transport, status and empty-response failures return [`ProviderError`].

pub mod chat;
pub mod parse;
mod prompt;

pub use chat::ChatCompletionsProvider;

use serde::Serialize;
use thiserror::Error;

use crate::db::models::reviews::Sentiment;

/// Maximum number of suggested actions kept from a model answer.
pub const MAX_SUGGESTED_ACTIONS: usize = 5;

/// Optional hints passed alongside the text.
#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    pub language: Option<String>,
}

/// Structured fields extracted from the model answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewAnalysis {
    pub summary: String,
    pub sentiment: Sentiment,
    /// At most [`MAX_SUGGESTED_ACTIONS`] entries
    pub suggested_actions: Vec<String>,
    pub suggested_response: String,
}

/// Token counts and wall-clock latency for one provider call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_tokens: i64,
    pub latency_ms: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub review: ReviewAnalysis,
    pub usage: TokenUsage,
}

/// Identifies the model that produced an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub provider: String,
    pub version: String,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider API key is not configured")]
    MissingApiKey,

    #[error("provider returned no completion choices")]
    EmptyResponse,
}

#[async_trait::async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Analyze one comment. Only call failures are errors; unparseable model
    /// output comes back as the fallback analysis.
    async fn analyze(&self, text: &str, context: &AnalysisContext) -> Result<AnalysisOutcome, ProviderError>;

    /// Pure accessor for the provider/model pair stamped on each review.
    fn model_info(&self) -> ModelInfo;
}
