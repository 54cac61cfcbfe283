//! OpenAPI document for the review API, served with Scalar at `/api/docs`.
//!
//! Every response body is wrapped in the envelope; success bodies are
//! documented as `Envelope<T>` and failures as [`ErrorEnvelope`](crate::api::models::envelope::ErrorEnvelope).

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Review Analysis API",
        description = "Language-model analysis of customer comments, with per-analysis cost metrics and agent usage tracking."
    ),
    paths(
        api::handlers::reviews::analyze_review,
        api::handlers::reviews::review_history,
        api::handlers::reviews::get_review,
        api::handlers::metrics::list_metrics,
        api::handlers::metrics::metrics_summary,
        api::handlers::usages::list_usages,
        api::handlers::usages::create_usage,
        api::handlers::usages::mark_usage_sent,
        api::handlers::health::health,
    ),
    components(
        schemas(
            api::models::envelope::ErrorCode,
            api::models::envelope::ErrorEnvelope,
            api::models::reviews::AnalyzeReviewRequest,
            api::models::reviews::ReviewResponse,
            api::models::reviews::ReviewDetailResponse,
            api::models::reviews::ReviewHistoryItem,
            api::models::metrics::ReviewMetricResponse,
            api::models::metrics::MetricsSummaryResponse,
            api::models::metrics::SentimentBreakdownResponse,
            api::models::usages::CreateReviewUsageRequest,
            api::models::usages::ReviewUsageResponse,
            api::models::health::HealthResponse,
            crate::db::models::reviews::Sentiment,
            crate::db::models::metrics::MetricStatus,
        )
    ),
    tags(
        (name = "reviews", description = "Comment analysis and review history"),
        (name = "review-metrics", description = "Token, cost and latency metrics per analysis"),
        (name = "review-usages", description = "How agents used the suggested responses"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/api/reviews",
            "/api/reviews/history",
            "/api/reviews/{id}",
            "/api/review-metrics",
            "/api/review-metrics/summary",
            "/api/review-usages",
            "/api/review-usages/{review_id}/sent",
            "/health",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn document_serializes() {
        let json = ApiDoc::openapi().to_json().unwrap();
        assert!(json.contains("\"openapi\""));
        assert!(json.contains("ErrorEnvelope"));
    }
}
