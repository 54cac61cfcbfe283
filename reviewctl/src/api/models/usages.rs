//! API request/response models for review usages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::usages::ReviewUsage;
use crate::reviews::CreateUsageRequest;
use crate::types::{ReviewId, UsageId};

/// Record how an agent used a review's suggested response.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewUsageRequest {
    /// Review the usage belongs to; required
    #[serde(default)]
    #[schema(format = "uuid")]
    pub review_id: String,
    #[serde(default)]
    pub agent_id: Option<String>,
    /// The response as actually edited by the agent
    #[serde(default)]
    pub edited_response: Option<String>,
    /// When true, `sentAt` is stamped at creation
    #[serde(default)]
    pub response_sent: Option<bool>,
}

impl From<CreateReviewUsageRequest> for CreateUsageRequest {
    fn from(request: CreateReviewUsageRequest) -> Self {
        Self {
            review_id: request.review_id,
            agent_id: request.agent_id,
            edited_response: request.edited_response,
            response_sent: request.response_sent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUsageResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UsageId,
    #[schema(value_type = String, format = "uuid")]
    pub review_id: ReviewId,
    pub agent_id: Option<String>,
    pub edited_response: Option<String>,
    pub response_sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ReviewUsage> for ReviewUsageResponse {
    fn from(usage: ReviewUsage) -> Self {
        Self {
            id: usage.id,
            review_id: usage.review_id,
            agent_id: usage.agent_id,
            edited_response: usage.edited_response,
            response_sent: usage.response_sent,
            sent_at: usage.sent_at,
            created_at: usage.created_at,
        }
    }
}
