//! One-usage-per-review bookkeeping.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{non_blank, parse_review_id};
use crate::db::errors::DbError;
use crate::db::handlers::{ReviewStore, UsageStore};
use crate::db::models::{
    page::{Page, PageRequest},
    usages::{ReviewUsage, UsageCreateDBRequest},
};
use crate::errors::{Error, Result};
use crate::types::{ReviewId, abbrev_uuid};

#[derive(Debug, Clone, Default)]
pub struct CreateUsageRequest {
    pub review_id: String,
    pub agent_id: Option<String>,
    pub edited_response: Option<String>,
    pub response_sent: Option<bool>,
}

pub struct UsageOrchestrator {
    reviews: Arc<dyn ReviewStore>,
    usages: Arc<dyn UsageStore>,
}

fn already_exists(review_id: ReviewId) -> Error {
    Error::Conflict {
        message: format!("A usage record already exists for review {review_id}"),
    }
}

fn review_not_found(review_id: ReviewId) -> Error {
    Error::NotFound {
        resource: "Review".to_string(),
        id: review_id.to_string(),
    }
}

impl UsageOrchestrator {
    pub fn new(reviews: Arc<dyn ReviewStore>, usages: Arc<dyn UsageStore>) -> Self {
        Self { reviews, usages }
    }

    /// Record what an agent did with a review's suggested response.
    ///
    /// The review must exist and must not already have a usage. The existence
    /// check is only a fast path: the store's unique constraint decides races,
    /// and its violation is reported as the same conflict.
    #[instrument(skip_all, fields(review_id = %request.review_id), err)]
    pub async fn create(&self, request: CreateUsageRequest) -> Result<ReviewUsage> {
        let review_id = parse_review_id(&request.review_id, "Review")?;

        if self.reviews.find_by_id(review_id).await?.is_none() {
            return Err(review_not_found(review_id));
        }
        if self.usages.find_by_review_id(review_id).await?.is_some() {
            return Err(already_exists(review_id));
        }

        let usage = ReviewUsage::from_request(
            Uuid::new_v4(),
            UsageCreateDBRequest {
                review_id,
                agent_id: non_blank(request.agent_id),
                edited_response: non_blank(request.edited_response),
                response_sent: request.response_sent.unwrap_or(false),
            },
            Utc::now(),
        );

        match self.usages.save(usage.clone()).await {
            Ok(()) => {
                info!(review_id = %abbrev_uuid(&review_id), sent = usage.response_sent, "Usage recorded");
                Ok(usage)
            }
            Err(e) if e.is_duplicate_usage() => Err(already_exists(review_id)),
            Err(DbError::ForeignKeyViolation { .. }) => Err(review_not_found(review_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Mark the review's suggested response as sent, stamping `sent_at` with
    /// the current instant. Repeated calls re-stamp it.
    #[instrument(skip(self), err)]
    pub async fn mark_as_sent(&self, review_id: &str) -> Result<ReviewUsage> {
        let review_id = parse_review_id(review_id, "Usage for review")?;

        self.usages
            .mark_as_sent(review_id, Utc::now())
            .await?
            .ok_or_else(|| Error::NotFound {
                resource: "Usage for review".to_string(),
                id: review_id.to_string(),
            })
    }

    /// Newest usages first.
    #[instrument(skip(self), err)]
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Page<ReviewUsage>> {
        let page = PageRequest::new(limit, offset)?;
        Ok(self.usages.find_all(page).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::InMemoryStore;
    use crate::db::models::reviews::{Review, Sentiment};
    use crate::test_utils::RacingUsageStore;

    async fn store_with_review() -> (InMemoryStore, ReviewId) {
        let store = InMemoryStore::new();
        let review = ReviewStore::save(
            &store,
            Review {
                id: Uuid::new_v4(),
                raw_text: "wrong size".to_string(),
                summary: "size issue".to_string(),
                sentiment: Sentiment::Negative,
                suggested_actions: vec!["Offer exchange".to_string()],
                suggested_response: "We can exchange it".to_string(),
                model_provider: "stub".to_string(),
                model_version: "v1".to_string(),
                language: None,
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();
        (store, review.id)
    }

    fn orchestrator(store: &InMemoryStore) -> UsageOrchestrator {
        UsageOrchestrator::new(Arc::new(store.clone()), Arc::new(store.clone()))
    }

    fn create_request(review_id: &str) -> CreateUsageRequest {
        CreateUsageRequest {
            review_id: review_id.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn blank_review_id_is_validation() {
        let (store, _) = store_with_review().await;
        let err = orchestrator(&store).create(create_request("  ")).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
    }

    #[tokio::test]
    async fn unknown_review_is_not_found() {
        let (store, _) = store_with_review().await;
        let err = orchestrator(&store)
            .create(create_request(&Uuid::new_v4().to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn second_usage_is_already_exists() {
        let (store, review_id) = store_with_review().await;
        let orchestrator = orchestrator(&store);

        orchestrator.create(create_request(&review_id.to_string())).await.unwrap();
        let err = orchestrator.create(create_request(&review_id.to_string())).await.unwrap_err();

        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[tokio::test]
    async fn sent_at_follows_response_sent_on_create() {
        let (store, review_id) = store_with_review().await;
        let usage = orchestrator(&store)
            .create(CreateUsageRequest {
                review_id: review_id.to_string(),
                agent_id: Some("  agent-42 ".to_string()),
                edited_response: Some("".to_string()),
                response_sent: Some(true),
            })
            .await
            .unwrap();

        assert!(usage.response_sent);
        assert_eq!(usage.sent_at, Some(usage.created_at));
        assert_eq!(usage.agent_id.as_deref(), Some("agent-42"));
        assert_eq!(usage.edited_response, None);

        let (store, review_id) = store_with_review().await;
        let pending = orchestrator(&store).create(create_request(&review_id.to_string())).await.unwrap();
        assert!(!pending.response_sent);
        assert_eq!(pending.sent_at, None);
    }

    #[tokio::test]
    async fn storage_conflict_from_a_race_is_already_exists() {
        // The pre-check sees no usage, but the insert loses the race
        let (store, review_id) = store_with_review().await;
        let orchestrator = UsageOrchestrator::new(Arc::new(store.clone()), Arc::new(RacingUsageStore));

        let err = orchestrator.create(create_request(&review_id.to_string())).await.unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[tokio::test]
    async fn concurrent_creates_yield_one_usage() {
        let (store, review_id) = store_with_review().await;
        let orchestrator = Arc::new(orchestrator(&store));

        let attempts: Vec<_> = (0..8)
            .map(move |_| {
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move { orchestrator.create(create_request(&review_id.to_string())).await })
            })
            .collect();

        let mut created = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => created += 1,
                Err(e) => assert!(matches!(e, Error::Conflict { .. }), "unexpected error {e:?}"),
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn mark_as_sent_requires_existing_usage() {
        let (store, review_id) = store_with_review().await;
        let orchestrator = orchestrator(&store);

        assert!(matches!(orchestrator.mark_as_sent("").await, Err(Error::BadRequest { .. })));
        let err = orchestrator.mark_as_sent(&review_id.to_string()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn mark_as_sent_stamps_and_restamps() {
        let (store, review_id) = store_with_review().await;
        let orchestrator = orchestrator(&store);
        orchestrator.create(create_request(&review_id.to_string())).await.unwrap();

        let first = orchestrator.mark_as_sent(&review_id.to_string()).await.unwrap();
        assert!(first.response_sent);
        let first_sent_at = first.sent_at.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = orchestrator.mark_as_sent(&review_id.to_string()).await.unwrap();
        assert!(second.sent_at.unwrap() > first_sent_at);
    }

    #[tokio::test]
    async fn list_validates_and_pages() {
        let (store, review_id) = store_with_review().await;
        let orchestrator = orchestrator(&store);
        orchestrator.create(create_request(&review_id.to_string())).await.unwrap();

        assert!(matches!(orchestrator.list(101, 0).await, Err(Error::BadRequest { .. })));
        let page = orchestrator.list(20, 0).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].review_id, review_id);
    }
}
