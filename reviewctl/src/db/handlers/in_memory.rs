//! In-memory implementation of every store.
//!
//! Holds all three tables behind one lock so the referential and uniqueness
//! rules of the PostgreSQL schema hold here too: metrics and usages must
//! reference an existing review, and `review_id` is unique among usages.
//! Suitable for tests and `database.type = memory`; data is lost on restart.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::db::errors::{DbError, Result, USAGE_REVIEW_UNIQUE_CONSTRAINT};
use crate::db::handlers::repository::{MetricStore, ReviewStore, UsageStore};
use crate::db::models::{
    metrics::{MetricStatus, MetricSummary, ReviewMetric},
    page::{Page, PageRequest},
    reviews::{Review, SentimentBreakdown},
    usages::ReviewUsage,
};
use crate::types::ReviewId;

#[derive(Default)]
struct Tables {
    reviews: Vec<Review>,
    metrics: Vec<ReviewMetric>,
    usages: Vec<ReviewUsage>,
}

impl Tables {
    fn has_review(&self, id: ReviewId) -> bool {
        self.reviews.iter().any(|r| r.id == id)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first; rows sharing a timestamp keep reverse insertion order.
fn newest_first<T: Clone>(rows: &[T], created_at: impl Fn(&T) -> DateTime<Utc>, page: PageRequest) -> Page<T> {
    let mut ordered: Vec<T> = rows.iter().rev().cloned().collect();
    ordered.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    Page {
        items: page.slice(&ordered),
        total: rows.len() as i64,
    }
}

fn missing_review(table: &str, review_id: ReviewId) -> DbError {
    DbError::ForeignKeyViolation {
        constraint: Some(format!("{table}_review_id_fkey")),
        table: Some(table.to_string()),
        message: format!("review {review_id} does not exist"),
    }
}

#[async_trait::async_trait]
impl ReviewStore for InMemoryStore {
    async fn save(&self, review: Review) -> Result<Review> {
        let mut tables = self.tables.write();
        if tables.has_review(review.id) {
            return Err(DbError::UniqueViolation {
                constraint: Some("reviews_pkey".to_string()),
                table: Some("reviews".to_string()),
                message: format!("review {} already exists", review.id),
            });
        }
        tables.reviews.push(review.clone());
        Ok(review)
    }

    async fn find_by_id(&self, id: ReviewId) -> Result<Option<Review>> {
        Ok(self.tables.read().reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn find_history(&self, page: PageRequest) -> Result<Page<Review>> {
        Ok(newest_first(&self.tables.read().reviews, |r| r.created_at, page))
    }
}

#[async_trait::async_trait]
impl MetricStore for InMemoryStore {
    async fn save(&self, metric: ReviewMetric) -> Result<()> {
        let mut tables = self.tables.write();
        if !tables.has_review(metric.review_id) {
            return Err(missing_review("review_metrics", metric.review_id));
        }
        tables.metrics.push(metric);
        Ok(())
    }

    async fn find_all(&self, page: PageRequest) -> Result<Page<ReviewMetric>> {
        Ok(newest_first(&self.tables.read().metrics, |m| m.created_at, page))
    }

    async fn summary(&self) -> Result<MetricSummary> {
        let tables = self.tables.read();
        let metrics = &tables.metrics;
        if metrics.is_empty() {
            return Ok(MetricSummary::default());
        }

        let count = metrics.len() as i64;
        let latency_sum: i64 = metrics.iter().map(|m| m.latency_ms).sum();
        let success_count = metrics.iter().filter(|m| m.status == MetricStatus::Success).count() as i64;

        Ok(MetricSummary {
            total_reviews: count,
            total_tokens: metrics.iter().map(|m| m.total_tokens).sum(),
            total_cost: metrics.iter().map(|m| m.estimated_cost).sum::<Decimal>(),
            average_latency_ms: (latency_sum as f64 / count as f64).round() as i64,
            success_count,
            error_count: count - success_count,
        })
    }

    async fn sentiment_breakdown(&self) -> Result<SentimentBreakdown> {
        let mut breakdown = SentimentBreakdown::default();
        for review in &self.tables.read().reviews {
            breakdown.add(review.sentiment, 1);
        }
        Ok(breakdown)
    }
}

#[async_trait::async_trait]
impl UsageStore for InMemoryStore {
    async fn save(&self, usage: ReviewUsage) -> Result<()> {
        // Check and insert under one write lock, like the unique index does
        let mut tables = self.tables.write();
        if !tables.has_review(usage.review_id) {
            return Err(missing_review("review_usages", usage.review_id));
        }
        if tables.usages.iter().any(|u| u.review_id == usage.review_id) {
            return Err(DbError::UniqueViolation {
                constraint: Some(USAGE_REVIEW_UNIQUE_CONSTRAINT.to_string()),
                table: Some("review_usages".to_string()),
                message: format!("usage for review {} already exists", usage.review_id),
            });
        }
        tables.usages.push(usage);
        Ok(())
    }

    async fn find_by_review_id(&self, review_id: ReviewId) -> Result<Option<ReviewUsage>> {
        Ok(self.tables.read().usages.iter().find(|u| u.review_id == review_id).cloned())
    }

    async fn find_all(&self, page: PageRequest) -> Result<Page<ReviewUsage>> {
        Ok(newest_first(&self.tables.read().usages, |u| u.created_at, page))
    }

    async fn mark_as_sent(&self, review_id: ReviewId, sent_at: DateTime<Utc>) -> Result<Option<ReviewUsage>> {
        let mut tables = self.tables.write();
        let Some(usage) = tables.usages.iter_mut().find(|u| u.review_id == review_id) else {
            return Ok(None);
        };
        usage.response_sent = true;
        usage.sent_at = Some(sent_at);
        Ok(Some(usage.clone()))
    }
}
