//! The analysis pipeline: one raw comment in, one persisted review out.

use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, histogram};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::cost::estimate_usage_cost;
use super::recorder::MetricSink;
use super::{non_blank, parse_review_id};
use crate::db::handlers::ReviewStore;
use crate::db::models::{
    metrics::{MetricStatus, ReviewMetric},
    page::{Page, PageRequest},
    reviews::Review,
};
use crate::errors::{Error, Result};
use crate::provider::{AnalysisContext, AnalysisOutcome, AnalysisProvider};
use crate::types::{ReviewId, abbrev_uuid};

#[derive(Debug, Clone, Default)]
pub struct AnalyzeRequest {
    pub text: String,
    pub language: Option<String>,
}

pub struct AnalysisOrchestrator {
    provider: Arc<dyn AnalysisProvider>,
    reviews: Arc<dyn ReviewStore>,
    metrics: MetricSink,
}

impl AnalysisOrchestrator {
    pub fn new(provider: Arc<dyn AnalysisProvider>, reviews: Arc<dyn ReviewStore>, metrics: MetricSink) -> Self {
        Self {
            provider,
            reviews,
            metrics,
        }
    }

    /// Analyze a comment and persist the resulting review.
    ///
    /// Blank text fails with a validation error before the provider or any
    /// store is touched. A provider failure is returned unchanged and nothing
    /// is written. The review write is awaited; the metric row is queued on
    /// the [`MetricSink`] and its outcome never reaches the caller.
    #[instrument(skip_all, fields(chars = request.text.len(), review_id = tracing::field::Empty), err)]
    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<Review> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(Error::BadRequest {
                message: "text is required and cannot be empty".to_string(),
            });
        }

        let context = AnalysisContext {
            language: non_blank(request.language),
        };

        let AnalysisOutcome { review: analysis, usage } = match self.provider.analyze(text, &context).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // No review exists to reference, so no metric row is built
                warn!(error = %e, "Analysis provider call failed");
                counter!("reviewctl_analyses_total", "status" => MetricStatus::Error.as_str()).increment(1);
                return Err(e.into());
            }
        };

        let model = self.provider.model_info();
        let review = self
            .reviews
            .save(Review {
                id: Uuid::new_v4(),
                raw_text: text.to_string(),
                summary: analysis.summary,
                sentiment: analysis.sentiment,
                suggested_actions: analysis.suggested_actions,
                suggested_response: analysis.suggested_response,
                model_provider: model.provider,
                model_version: model.version,
                language: context.language,
                created_at: Utc::now(),
            })
            .await?;
        tracing::Span::current().record("review_id", abbrev_uuid(&review.id));

        self.metrics.record(ReviewMetric {
            id: Uuid::new_v4(),
            review_id: review.id,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            total_tokens: usage.total_tokens,
            estimated_cost: estimate_usage_cost(&usage),
            latency_ms: usage.latency_ms,
            status: MetricStatus::Success,
            created_at: Utc::now(),
        });

        counter!("reviewctl_analyses_total", "status" => MetricStatus::Success.as_str()).increment(1);
        counter!("reviewctl_analysis_tokens_total", "direction" => "input").increment(usage.input_tokens as u64);
        counter!("reviewctl_analysis_tokens_total", "direction" => "output").increment(usage.output_tokens as u64);
        histogram!("reviewctl_analysis_latency_ms").record(usage.latency_ms as f64);

        info!(sentiment = %review.sentiment, latency_ms = usage.latency_ms, "Review analyzed");
        Ok(review)
    }

    /// Look up one review by its client-supplied id.
    #[instrument(skip(self), err)]
    pub async fn find_by_id(&self, id: &str) -> Result<Review> {
        let review_id: ReviewId = parse_review_id(id, "Review")?;
        self.reviews.find_by_id(review_id).await?.ok_or_else(|| Error::NotFound {
            resource: "Review".to_string(),
            id: review_id.to_string(),
        })
    }

    /// Newest reviews first.
    #[instrument(skip(self), err)]
    pub async fn history(&self, limit: i64, offset: i64) -> Result<Page<Review>> {
        let page = PageRequest::new(limit, offset)?;
        Ok(self.reviews.find_history(page).await?)
    }
}
