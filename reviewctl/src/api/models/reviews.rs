//! API request/response models for reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::reviews::{Review, Sentiment};
use crate::reviews::AnalyzeRequest;
use crate::types::ReviewId;

/// Comment to analyze.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeReviewRequest {
    /// Raw customer comment; must not be blank
    #[serde(default)]
    #[schema(example = "El pedido llegó tarde y la caja estaba rota")]
    pub text: String,
    /// Optional language hint, e.g. `es`
    #[serde(default)]
    pub language: Option<String>,
}

impl From<AnalyzeReviewRequest> for AnalyzeRequest {
    fn from(request: AnalyzeReviewRequest) -> Self {
        Self {
            text: request.text,
            language: request.language,
        }
    }
}

/// Structured analysis of one comment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    #[schema(value_type = String, format = "uuid")]
    pub review_id: ReviewId,
    pub summary: String,
    pub sentiment: Sentiment,
    pub suggested_actions: Vec<String>,
    pub suggested_response: String,
    pub model_provider: String,
    pub model_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            review_id: review.id,
            summary: review.summary,
            sentiment: review.sentiment,
            suggested_actions: review.suggested_actions,
            suggested_response: review.suggested_response,
            model_provider: review.model_provider,
            model_version: review.model_version,
            language: review.language,
            created_at: review.created_at,
        }
    }
}

/// A review with the original comment text.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDetailResponse {
    #[schema(value_type = String, format = "uuid")]
    pub review_id: ReviewId,
    pub raw_text: String,
    pub summary: String,
    pub sentiment: Sentiment,
    pub suggested_actions: Vec<String>,
    pub suggested_response: String,
    pub model_provider: String,
    pub model_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Review> for ReviewDetailResponse {
    fn from(review: Review) -> Self {
        Self {
            review_id: review.id,
            raw_text: review.raw_text,
            summary: review.summary,
            sentiment: review.sentiment,
            suggested_actions: review.suggested_actions,
            suggested_response: review.suggested_response,
            model_provider: review.model_provider,
            model_version: review.model_version,
            language: review.language,
            created_at: review.created_at,
        }
    }
}

/// Condensed history row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewHistoryItem {
    #[schema(value_type = String, format = "uuid")]
    pub review_id: ReviewId,
    pub raw_text: String,
    pub sentiment: Sentiment,
    pub created_at: DateTime<Utc>,
}

impl From<Review> for ReviewHistoryItem {
    fn from(review: Review) -> Self {
        Self {
            review_id: review.id,
            raw_text: review.raw_text,
            sentiment: review.sentiment,
            created_at: review.created_at,
        }
    }
}
