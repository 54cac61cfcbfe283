//! PostgreSQL store for analyzed reviews.

use sqlx::PgPool;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::handlers::repository::ReviewStore;
use crate::db::models::{
    page::{Page, PageRequest},
    reviews::Review,
};
use crate::types::{ReviewId, abbrev_uuid};

const REVIEW_COLUMNS: &str = "id, raw_text, summary, sentiment, suggested_actions, suggested_response, \
                              model_provider, model_version, language, created_at";

pub struct Reviews {
    db: PgPool,
}

impl Reviews {
    /// Create a new Reviews store over a connection pool
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl ReviewStore for Reviews {
    #[instrument(skip(self, review), fields(review_id = %abbrev_uuid(&review.id), sentiment = %review.sentiment), err)]
    async fn save(&self, review: Review) -> Result<Review> {
        let query = format!(
            r#"
            INSERT INTO reviews (
                id, raw_text, summary, sentiment, suggested_actions, suggested_response,
                model_provider, model_version, language, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {REVIEW_COLUMNS}
            "#
        );

        let saved = sqlx::query_as::<_, Review>(&query)
            .bind(review.id)
            .bind(&review.raw_text)
            .bind(&review.summary)
            .bind(review.sentiment.as_str())
            .bind(&review.suggested_actions)
            .bind(&review.suggested_response)
            .bind(&review.model_provider)
            .bind(&review.model_version)
            .bind(&review.language)
            .bind(review.created_at)
            .fetch_one(&self.db)
            .await?;

        Ok(saved)
    }

    #[instrument(skip(self), fields(review_id = %abbrev_uuid(&id)), err)]
    async fn find_by_id(&self, id: ReviewId) -> Result<Option<Review>> {
        let query = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1");
        let review = sqlx::query_as::<_, Review>(&query).bind(id).fetch_optional(&self.db).await?;

        Ok(review)
    }

    #[instrument(skip(self), fields(limit = page.limit(), offset = page.offset()), err)]
    async fn find_history(&self, page: PageRequest) -> Result<Page<Review>> {
        let query = format!("SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2");

        let (items, total) = tokio::try_join!(
            sqlx::query_as::<_, Review>(&query)
                .bind(page.limit())
                .bind(page.offset())
                .fetch_all(&self.db),
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reviews").fetch_one(&self.db),
        )?;

        Ok(Page { items, total })
    }
}
