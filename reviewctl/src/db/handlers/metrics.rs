//! PostgreSQL store for analysis metrics and their aggregates.

use anyhow::Context;
use sqlx::PgPool;
use tracing::instrument;

use crate::db::errors::{DbError, Result};
use crate::db::handlers::repository::MetricStore;
use crate::db::models::{
    metrics::{MetricSummary, ReviewMetric},
    page::{Page, PageRequest},
    reviews::{Sentiment, SentimentBreakdown},
};
use crate::types::abbrev_uuid;

pub struct ReviewMetrics {
    db: PgPool,
}

impl ReviewMetrics {
    /// Create a new ReviewMetrics store over a connection pool
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl MetricStore for ReviewMetrics {
    #[instrument(skip(self, metric), fields(review_id = %abbrev_uuid(&metric.review_id), status = %metric.status), err)]
    async fn save(&self, metric: ReviewMetric) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO review_metrics (
                id, review_id, input_tokens, output_tokens, total_tokens,
                estimated_cost, latency_ms, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(metric.id)
        .bind(metric.review_id)
        .bind(metric.input_tokens)
        .bind(metric.output_tokens)
        .bind(metric.total_tokens)
        .bind(metric.estimated_cost)
        .bind(metric.latency_ms)
        .bind(metric.status.as_str())
        .bind(metric.created_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(limit = page.limit(), offset = page.offset()), err)]
    async fn find_all(&self, page: PageRequest) -> Result<Page<ReviewMetric>> {
        let (items, total) = tokio::try_join!(
            sqlx::query_as::<_, ReviewMetric>(
                r#"
                SELECT id, review_id, input_tokens, output_tokens, total_tokens,
                       estimated_cost, latency_ms, status, created_at
                FROM review_metrics
                ORDER BY created_at DESC, id DESC
                LIMIT $1 OFFSET $2
                "#,
            )
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.db),
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM review_metrics").fetch_one(&self.db),
        )?;

        Ok(Page { items, total })
    }

    #[instrument(skip(self), err)]
    async fn summary(&self) -> Result<MetricSummary> {
        let summary = sqlx::query_as::<_, MetricSummary>(
            r#"
            SELECT
                COUNT(*)::BIGINT AS total_reviews,
                COALESCE(SUM(total_tokens), 0)::BIGINT AS total_tokens,
                COALESCE(SUM(estimated_cost), 0) AS total_cost,
                COALESCE(ROUND(AVG(latency_ms)), 0)::BIGINT AS average_latency_ms,
                COUNT(*) FILTER (WHERE status = 'SUCCESS')::BIGINT AS success_count,
                COUNT(*) FILTER (WHERE status = 'ERROR')::BIGINT AS error_count
            FROM review_metrics
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        Ok(summary)
    }

    #[instrument(skip(self), err)]
    async fn sentiment_breakdown(&self) -> Result<SentimentBreakdown> {
        let rows = sqlx::query_as::<_, (String, i64)>("SELECT sentiment, COUNT(*)::BIGINT FROM reviews GROUP BY sentiment")
            .fetch_all(&self.db)
            .await?;

        let mut breakdown = SentimentBreakdown::default();
        for (sentiment, count) in rows {
            let sentiment: Sentiment = sentiment
                .parse()
                .context("reviews table holds a sentiment outside the enum")
                .map_err(DbError::Other)?;
            breakdown.add(sentiment, count);
        }

        Ok(breakdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{ReviewStore, Reviews};
    use crate::db::models::{metrics::MetricStatus, reviews::Review};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    async fn seed_review(pool: &PgPool, sentiment: Sentiment) -> Review {
        Reviews::new(pool.clone())
            .save(Review {
                id: Uuid::new_v4(),
                raw_text: "text".to_string(),
                summary: "summary".to_string(),
                sentiment,
                suggested_actions: vec![],
                suggested_response: "thanks".to_string(),
                model_provider: "gemini".to_string(),
                model_version: "gemini-2.0-flash".to_string(),
                language: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap()
    }

    fn metric(review: &Review, latency_ms: i64, status: MetricStatus) -> ReviewMetric {
        ReviewMetric {
            id: Uuid::new_v4(),
            review_id: review.id,
            input_tokens: 100,
            output_tokens: 200,
            total_tokens: 300,
            estimated_cost: Decimal::new(9, 5),
            latency_ms,
            status,
            created_at: Utc::now(),
        }
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
    async fn summary_aggregates_all_rows(pool: PgPool) {
        let store = ReviewMetrics::new(pool.clone());
        let a = seed_review(&pool, Sentiment::Positive).await;
        let b = seed_review(&pool, Sentiment::Positive).await;
        let c = seed_review(&pool, Sentiment::Negative).await;

        store.save(metric(&a, 100, MetricStatus::Success)).await.unwrap();
        store.save(metric(&b, 201, MetricStatus::Success)).await.unwrap();
        store.save(metric(&c, 300, MetricStatus::Error)).await.unwrap();

        let summary = store.summary().await.unwrap();
        assert_eq!(summary.total_reviews, 3);
        assert_eq!(summary.total_tokens, 900);
        assert_eq!(summary.total_cost, Decimal::new(27, 5));
        assert_eq!(summary.average_latency_ms, 200);
        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.error_count, 1);

        let breakdown = store.sentiment_breakdown().await.unwrap();
        assert_eq!((breakdown.positive, breakdown.neutral, breakdown.negative), (2, 0, 1));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
    async fn empty_table_summarizes_to_zero(pool: PgPool) {
        let summary = ReviewMetrics::new(pool).summary().await.unwrap();
        assert_eq!(summary, MetricSummary::default());
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
    async fn metric_for_unknown_review_is_rejected(pool: PgPool) {
        let orphan = Review {
            id: Uuid::new_v4(),
            raw_text: String::new(),
            summary: String::new(),
            sentiment: Sentiment::Neutral,
            suggested_actions: vec![],
            suggested_response: String::new(),
            model_provider: String::new(),
            model_version: String::new(),
            language: None,
            created_at: Utc::now(),
        };
        let err = ReviewMetrics::new(pool).save(metric(&orphan, 1, MetricStatus::Success)).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
