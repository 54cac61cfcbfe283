//! Database models for per-attempt analysis telemetry.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::UnknownVariant;
use crate::types::{MetricId, ReviewId};

/// Outcome of one analysis attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricStatus {
    Success,
    Error,
}

impl MetricStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for MetricStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(Self::Success),
            "ERROR" => Ok(Self::Error),
            other => Err(UnknownVariant {
                kind: "metric status",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for MetricStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, UnknownVariant> {
        value.parse()
    }
}

/// Token, cost and latency telemetry for one analysis call.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ReviewMetric {
    pub id: MetricId,
    pub review_id: ReviewId,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_tokens: i64,
    /// USD, derived from token counts at insert time
    pub estimated_cost: Decimal,
    pub latency_ms: i64,
    #[sqlx(try_from = "String")]
    pub status: MetricStatus,
    pub created_at: DateTime<Utc>,
}

/// Aggregates over every stored metric row.
#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct MetricSummary {
    /// Number of metric rows (one per recorded analysis)
    pub total_reviews: i64,
    pub total_tokens: i64,
    pub total_cost: Decimal,
    /// Mean latency rounded to the nearest millisecond, 0 when there are no rows
    pub average_latency_ms: i64,
    pub success_count: i64,
    pub error_count: i64,
}
