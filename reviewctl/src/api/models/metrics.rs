//! API response models for analysis metrics.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::metrics::{MetricStatus, ReviewMetric};
use crate::db::models::reviews::SentimentBreakdown;
use crate::reviews::MetricsOverview;
use crate::types::{MetricId, ReviewId};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewMetricResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: MetricId,
    #[schema(value_type = String, format = "uuid")]
    pub review_id: ReviewId,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_tokens: i64,
    /// Estimated cost in USD
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub estimated_cost: Decimal,
    pub latency_ms: i64,
    pub status: MetricStatus,
    pub created_at: DateTime<Utc>,
}

impl From<ReviewMetric> for ReviewMetricResponse {
    fn from(metric: ReviewMetric) -> Self {
        Self {
            id: metric.id,
            review_id: metric.review_id,
            input_tokens: metric.input_tokens,
            output_tokens: metric.output_tokens,
            total_tokens: metric.total_tokens,
            estimated_cost: metric.estimated_cost,
            latency_ms: metric.latency_ms,
            status: metric.status,
            created_at: metric.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct SentimentBreakdownResponse {
    pub positive: i64,
    pub neutral: i64,
    pub negative: i64,
}

impl From<SentimentBreakdown> for SentimentBreakdownResponse {
    fn from(breakdown: SentimentBreakdown) -> Self {
        Self {
            positive: breakdown.positive,
            neutral: breakdown.neutral,
            negative: breakdown.negative,
        }
    }
}

/// Aggregate view over all recorded analyses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummaryResponse {
    /// Number of recorded analyses
    pub total_reviews: i64,
    pub total_tokens: i64,
    /// Total estimated cost in USD
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total_cost: Decimal,
    /// Mean latency, rounded to the nearest millisecond
    pub average_latency_ms: i64,
    pub success_count: i64,
    pub error_count: i64,
    /// Counts over every stored review
    pub sentiment_breakdown: SentimentBreakdownResponse,
}

impl From<MetricsOverview> for MetricsSummaryResponse {
    fn from(overview: MetricsOverview) -> Self {
        let summary = overview.summary;
        Self {
            total_reviews: summary.total_reviews,
            total_tokens: summary.total_tokens,
            total_cost: summary.total_cost,
            average_latency_ms: summary.average_latency_ms,
            success_count: summary.success_count,
            error_count: summary.error_count,
            sentiment_breakdown: overview.sentiment.into(),
        }
    }
}
