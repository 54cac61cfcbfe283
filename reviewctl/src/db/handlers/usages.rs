//! PostgreSQL store for agent usage records.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::handlers::repository::UsageStore;
use crate::db::models::{
    page::{Page, PageRequest},
    usages::ReviewUsage,
};
use crate::types::{ReviewId, abbrev_uuid};

const USAGE_COLUMNS: &str = "id, review_id, agent_id, edited_response, response_sent, sent_at, created_at";

pub struct ReviewUsages {
    db: PgPool,
}

impl ReviewUsages {
    /// Create a new ReviewUsages store over a connection pool
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl UsageStore for ReviewUsages {
    /// Relies on the `review_usages_review_id_key` unique constraint, so a
    /// concurrent duplicate surfaces as a unique violation instead of a second row.
    #[instrument(skip(self, usage), fields(review_id = %abbrev_uuid(&usage.review_id)), err)]
    async fn save(&self, usage: ReviewUsage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO review_usages (id, review_id, agent_id, edited_response, response_sent, sent_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(usage.id)
        .bind(usage.review_id)
        .bind(&usage.agent_id)
        .bind(&usage.edited_response)
        .bind(usage.response_sent)
        .bind(usage.sent_at)
        .bind(usage.created_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(review_id = %abbrev_uuid(&review_id)), err)]
    async fn find_by_review_id(&self, review_id: ReviewId) -> Result<Option<ReviewUsage>> {
        let query = format!("SELECT {USAGE_COLUMNS} FROM review_usages WHERE review_id = $1");
        let usage = sqlx::query_as::<_, ReviewUsage>(&query)
            .bind(review_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(usage)
    }

    #[instrument(skip(self), fields(limit = page.limit(), offset = page.offset()), err)]
    async fn find_all(&self, page: PageRequest) -> Result<Page<ReviewUsage>> {
        let query = format!("SELECT {USAGE_COLUMNS} FROM review_usages ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2");

        let (items, total) = tokio::try_join!(
            sqlx::query_as::<_, ReviewUsage>(&query)
                .bind(page.limit())
                .bind(page.offset())
                .fetch_all(&self.db),
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM review_usages").fetch_one(&self.db),
        )?;

        Ok(Page { items, total })
    }

    #[instrument(skip(self), fields(review_id = %abbrev_uuid(&review_id)), err)]
    async fn mark_as_sent(&self, review_id: ReviewId, sent_at: DateTime<Utc>) -> Result<Option<ReviewUsage>> {
        let query = format!(
            r#"
            UPDATE review_usages
            SET response_sent = TRUE, sent_at = $2
            WHERE review_id = $1
            RETURNING {USAGE_COLUMNS}
            "#
        );
        let usage = sqlx::query_as::<_, ReviewUsage>(&query)
            .bind(review_id)
            .bind(sent_at)
            .fetch_optional(&self.db)
            .await?;

        Ok(usage)
    }
}
