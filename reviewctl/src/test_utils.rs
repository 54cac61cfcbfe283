//! Test doubles and app helpers shared across unit and HTTP tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum_test::TestServer;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::config::{Config, DatabaseConfig, ProviderConfig};
use crate::db::Persistence;
use crate::db::errors::{DbError, Result as DbResult, USAGE_REVIEW_UNIQUE_CONSTRAINT};
use crate::db::handlers::{MetricStore, ReviewStore, UsageStore};
use crate::db::models::{
    metrics::{MetricSummary, ReviewMetric},
    page::{Page, PageRequest},
    reviews::{Review, Sentiment, SentimentBreakdown},
    usages::ReviewUsage,
};
use crate::provider::{
    AnalysisContext, AnalysisOutcome, AnalysisProvider, ModelInfo, ProviderError, ReviewAnalysis, TokenUsage,
};
use crate::types::ReviewId;

enum Behaviour {
    Succeed(AnalysisOutcome),
    Fail(fn() -> ProviderError),
}

/// Provider double with a fixed answer that counts its calls.
pub struct StubProvider {
    behaviour: Behaviour,
    calls: AtomicUsize,
    last_language: Mutex<Option<String>>,
}

impl StubProvider {
    pub fn returning(review: ReviewAnalysis, usage: TokenUsage) -> Self {
        Self {
            behaviour: Behaviour::Succeed(AnalysisOutcome { review, usage }),
            calls: AtomicUsize::new(0),
            last_language: Mutex::new(None),
        }
    }

    pub fn with_usage(input_tokens: i64, output_tokens: i64) -> Self {
        Self::returning(
            ReviewAnalysis {
                summary: "Customer reports a delivery problem".to_string(),
                sentiment: Sentiment::Negative,
                suggested_actions: vec!["Check tracking".to_string(), "Contact courier".to_string()],
                suggested_response: "Lamentamos el retraso, ya estamos revisando tu pedido.".to_string(),
            },
            TokenUsage {
                input_tokens,
                output_tokens,
                total_tokens: input_tokens + output_tokens,
                latency_ms: 42,
            },
        )
    }

    pub fn succeeding() -> Self {
        Self::with_usage(10, 20)
    }

    pub fn failing(error: fn() -> ProviderError) -> Self {
        Self {
            behaviour: Behaviour::Fail(error),
            calls: AtomicUsize::new(0),
            last_language: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_language(&self) -> Option<String> {
        self.last_language.lock().clone()
    }
}

#[async_trait::async_trait]
impl AnalysisProvider for StubProvider {
    async fn analyze(&self, _text: &str, context: &AnalysisContext) -> Result<AnalysisOutcome, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_language.lock() = context.language.clone();
        match &self.behaviour {
            Behaviour::Succeed(outcome) => Ok(outcome.clone()),
            Behaviour::Fail(error) => Err(error()),
        }
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "stub".to_string(),
            version: "stub-model-1".to_string(),
        }
    }
}

fn unavailable(what: &str) -> DbError {
    DbError::Other(anyhow::anyhow!("{what} store unavailable"))
}

/// Metric store whose every operation fails.
pub struct FailingMetricStore;

#[async_trait::async_trait]
impl MetricStore for FailingMetricStore {
    async fn save(&self, _metric: ReviewMetric) -> DbResult<()> {
        Err(unavailable("metric"))
    }

    async fn find_all(&self, _page: PageRequest) -> DbResult<Page<ReviewMetric>> {
        Err(unavailable("metric"))
    }

    async fn summary(&self) -> DbResult<MetricSummary> {
        Err(unavailable("metric"))
    }

    async fn sentiment_breakdown(&self) -> DbResult<SentimentBreakdown> {
        Err(unavailable("metric"))
    }
}

/// Review store whose every operation fails.
pub struct FailingReviewStore;

#[async_trait::async_trait]
impl ReviewStore for FailingReviewStore {
    async fn save(&self, _review: Review) -> DbResult<Review> {
        Err(unavailable("review"))
    }

    async fn find_by_id(&self, _id: ReviewId) -> DbResult<Option<Review>> {
        Err(unavailable("review"))
    }

    async fn find_history(&self, _page: PageRequest) -> DbResult<Page<Review>> {
        Err(unavailable("review"))
    }
}

/// Usage store that always loses the insert race: the lookup sees nothing,
/// then the insert hits the unique constraint.
pub struct RacingUsageStore;

#[async_trait::async_trait]
impl UsageStore for RacingUsageStore {
    async fn save(&self, usage: ReviewUsage) -> DbResult<()> {
        Err(DbError::UniqueViolation {
            constraint: Some(USAGE_REVIEW_UNIQUE_CONSTRAINT.to_string()),
            table: Some("review_usages".to_string()),
            message: format!("duplicate key value (review_id)=({})", usage.review_id),
        })
    }

    async fn find_by_review_id(&self, _review_id: ReviewId) -> DbResult<Option<ReviewUsage>> {
        Ok(None)
    }

    async fn find_all(&self, _page: PageRequest) -> DbResult<Page<ReviewUsage>> {
        Ok(Page { items: vec![], total: 0 })
    }

    async fn mark_as_sent(&self, _review_id: ReviewId, _sent_at: DateTime<Utc>) -> DbResult<Option<ReviewUsage>> {
        Ok(None)
    }
}

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database: DatabaseConfig::Memory,
        provider: ProviderConfig {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// HTTP test server over in-memory stores and the given provider.
pub fn create_test_app(provider: Arc<dyn AnalysisProvider>) -> (TestServer, crate::BackgroundServices) {
    let app = crate::Application::with_parts(create_test_config(), Persistence::in_memory(), provider)
        .expect("Failed to build application");
    app.into_test_server()
}
