//! Storage record models matching table schemas.
//!
//! Each struct mirrors one table row and derives `sqlx::FromRow`. They are
//! distinct from the API DTOs in [`crate::api::models`] so the wire format
//! (camelCase, envelope, float costs) can evolve independently of storage.
//!
//! - [`reviews`]: analyzed comments and the sentiment enum
//! - [`metrics`]: per-attempt telemetry and aggregate summaries
//! - [`usages`]: agent usage of suggested responses
//! - [`page`]: validated pagination window and page results

pub mod metrics;
pub mod page;
pub mod reviews;
pub mod usages;

use thiserror::Error;

/// A stored enum column held a value outside its variant set.
#[derive(Debug, Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
