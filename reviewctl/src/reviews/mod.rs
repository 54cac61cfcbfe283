//! Review pipeline: analysis, agent usage and metric aggregation.
//!
//! ```text
//!   analyze(text) ──► AnalysisOrchestrator
//!                        │ 1. validate (blank text → VALIDATION, nothing else runs)
//!                        │ 2. AnalysisProvider::analyze      (failure propagates, no writes)
//!                        │ 3. ReviewStore::save              (awaited, failure is fatal)
//!                        │ 4. MetricSink::record             (queued, never awaited)
//!                        ▼
//!                      Review
//!
//!   create / mark_as_sent ──► UsageOrchestrator   (one usage per review)
//!   list / summary        ──► MetricAggregator    (read-only)
//! ```
//!
//! Orchestrators hold only store handles; all state lives in the stores.

pub mod analysis;
pub mod cost;
pub mod metrics;
pub mod recorder;
pub mod usage;

pub use analysis::{AnalysisOrchestrator, AnalyzeRequest};
pub use metrics::{MetricAggregator, MetricsOverview};
pub use recorder::{MetricRecorder, MetricSink, RecorderHandle};
pub use usage::{CreateUsageRequest, UsageOrchestrator};

use uuid::Uuid;

use crate::errors::{Error, Result};
use crate::types::ReviewId;

/// Parse a client-supplied review id. Blank is a validation failure; anything
/// that is not a UUID cannot name a stored review, so it is reported missing.
pub(crate) fn parse_review_id(raw: &str, resource: &str) -> Result<ReviewId> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::BadRequest {
            message: "reviewId is required".to_string(),
        });
    }
    Uuid::parse_str(raw).map_err(|_| Error::NotFound {
        resource: resource.to_string(),
        id: raw.to_string(),
    })
}

/// Trim an optional string, treating blank as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
