//! Store traits the orchestrators depend on.
//!
//! Each store owns one entity. Orchestrators hold `Arc<dyn ...Store>` handles
//! so PostgreSQL and in-memory backends are interchangeable.

use chrono::{DateTime, Utc};

use crate::db::errors::Result;
use crate::db::models::{
    metrics::{MetricSummary, ReviewMetric},
    page::{Page, PageRequest},
    reviews::{Review, SentimentBreakdown},
    usages::ReviewUsage,
};
use crate::types::ReviewId;

#[async_trait::async_trait]
pub trait ReviewStore: Send + Sync {
    /// Insert a review and return it as stored
    async fn save(&self, review: Review) -> Result<Review>;

    async fn find_by_id(&self, id: ReviewId) -> Result<Option<Review>>;

    /// Newest first
    async fn find_history(&self, page: PageRequest) -> Result<Page<Review>>;
}

#[async_trait::async_trait]
pub trait MetricStore: Send + Sync {
    async fn save(&self, metric: ReviewMetric) -> Result<()>;

    /// Newest first
    async fn find_all(&self, page: PageRequest) -> Result<Page<ReviewMetric>>;

    async fn summary(&self) -> Result<MetricSummary>;

    /// Counts by sentiment across all reviews, not only those with metrics
    async fn sentiment_breakdown(&self) -> Result<SentimentBreakdown>;
}

#[async_trait::async_trait]
pub trait UsageStore: Send + Sync {
    /// Insert a usage. A second usage for the same review fails with
    /// [`DbError::UniqueViolation`](crate::db::errors::DbError::UniqueViolation).
    async fn save(&self, usage: ReviewUsage) -> Result<()>;

    async fn find_by_review_id(&self, review_id: ReviewId) -> Result<Option<ReviewUsage>>;

    /// Newest first
    async fn find_all(&self, page: PageRequest) -> Result<Page<ReviewUsage>>;

    /// Flip `response_sent` and stamp `sent_at`. Returns the updated row, or
    /// `None` when the review has no usage.
    async fn mark_as_sent(&self, review_id: ReviewId, sent_at: DateTime<Utc>) -> Result<Option<ReviewUsage>>;
}
