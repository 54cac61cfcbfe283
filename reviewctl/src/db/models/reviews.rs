//! Database models for analyzed reviews.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::UnknownVariant;
use crate::types::ReviewId;

/// Overall tone of a customer comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "POSITIVE",
            Self::Neutral => "NEUTRAL",
            Self::Negative => "NEGATIVE",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|v| v.as_str() == s).ok_or_else(|| UnknownVariant {
            kind: "sentiment",
            value: s.to_string(),
        })
    }
}

impl TryFrom<String> for Sentiment {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, UnknownVariant> {
        value.parse()
    }
}

/// A persisted analysis of one customer comment. Never updated after insert.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub raw_text: String,
    pub summary: String,
    #[sqlx(try_from = "String")]
    pub sentiment: Sentiment,
    pub suggested_actions: Vec<String>,
    pub suggested_response: String,
    pub model_provider: String,
    pub model_version: String,
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Review counts per sentiment, over every stored review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentBreakdown {
    pub positive: i64,
    pub neutral: i64,
    pub negative: i64,
}

impl SentimentBreakdown {
    pub fn add(&mut self, sentiment: Sentiment, count: i64) {
        match sentiment {
            Sentiment::Positive => self.positive += count,
            Sentiment::Neutral => self.neutral += count,
            Sentiment::Negative => self.negative += count,
        }
    }
}
