//! Database models for agent usage of suggested responses.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::{ReviewId, UsageId};

/// What an agent did with a review's suggested response. One per review.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ReviewUsage {
    pub id: UsageId,
    pub review_id: ReviewId,
    pub agent_id: Option<String>,
    pub edited_response: Option<String>,
    pub response_sent: bool,
    /// Set exactly when `response_sent` is true
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a usage row.
#[derive(Debug, Clone)]
pub struct UsageCreateDBRequest {
    pub review_id: ReviewId,
    pub agent_id: Option<String>,
    pub edited_response: Option<String>,
    pub response_sent: bool,
}

impl ReviewUsage {
    /// Materialize a new row from an insert request at the given instant.
    pub fn from_request(id: UsageId, request: UsageCreateDBRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            review_id: request.review_id,
            agent_id: request.agent_id,
            edited_response: request.edited_response,
            response_sent: request.response_sent,
            sent_at: request.response_sent.then_some(now),
            created_at: now,
        }
    }
}
