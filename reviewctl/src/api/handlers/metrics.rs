use axum::extract::{Query, State};

use crate::AppState;
use crate::api::models::envelope::{ApiResponse, Envelope, ErrorEnvelope};
use crate::api::models::metrics::{MetricsSummaryResponse, ReviewMetricResponse};
use crate::api::models::pagination::{ListResponse, Pagination};
use crate::errors::Result;

#[utoipa::path(
    get,
    path = "/api/review-metrics",
    tag = "review-metrics",
    summary = "List per-analysis metrics, newest first",
    params(Pagination),
    responses(
        (status = 200, description = "Page of metrics", body = Envelope<ListResponse<ReviewMetricResponse>>),
        (status = 400, description = "Invalid pagination", body = ErrorEnvelope),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_metrics(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<ApiResponse<ListResponse<ReviewMetricResponse>>> {
    let page = state.metrics.list(pagination.limit(), pagination.offset()).await?;
    Ok(ApiResponse::ok(ListResponse::from_page(page)))
}

#[utoipa::path(
    get,
    path = "/api/review-metrics/summary",
    tag = "review-metrics",
    summary = "Aggregate metrics with the sentiment breakdown",
    responses(
        (status = 200, description = "Summary over all recorded analyses", body = Envelope<MetricsSummaryResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn metrics_summary(State(state): State<AppState>) -> Result<ApiResponse<MetricsSummaryResponse>> {
    let overview = state.metrics.overview().await?;
    Ok(ApiResponse::ok(overview.into()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::{Value, json};

    use crate::test_utils::{StubProvider, create_test_app};

    /// Metric rows are written by the background recorder; poll until they land.
    async fn wait_for_metrics(server: &axum_test::TestServer, expected: u64) -> Value {
        for _ in 0..100 {
            let body: Value = server.get("/api/review-metrics").await.json();
            if body["data"]["total"] == expected {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("metrics never reached {expected} rows");
    }

    #[tokio::test]
    async fn empty_summary_is_all_zeroes() {
        let (server, _bg) = create_test_app(Arc::new(StubProvider::succeeding()));
        let response = server.get("/api/review-metrics/summary").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(
            body["data"],
            json!({
                "totalReviews": 0,
                "totalTokens": 0,
                "totalCost": 0.0,
                "averageLatencyMs": 0,
                "successCount": 0,
                "errorCount": 0,
                "sentimentBreakdown": { "positive": 0, "neutral": 0, "negative": 0 }
            })
        );
    }

    #[tokio::test]
    async fn metrics_follow_analyses() {
        let (server, _bg) = create_test_app(Arc::new(StubProvider::with_usage(1000, 500)));
        for text in ["uno", "dos"] {
            server.post("/api/reviews").json(&json!({ "text": text })).await.assert_status_ok();
        }

        let body = wait_for_metrics(&server, 2).await;
        let first = &body["data"]["items"][0];
        assert_eq!(first["inputTokens"], 1000);
        assert_eq!(first["outputTokens"], 500);
        assert_eq!(first["totalTokens"], 1500);
        assert_eq!(first["latencyMs"], 42);
        assert_eq!(first["status"], "SUCCESS");
        // (1000 * 0.1 + 500 * 0.4) / 1e6
        assert_eq!(first["estimatedCost"].as_f64(), Some(0.0003));

        let summary: Value = server.get("/api/review-metrics/summary").await.json();
        let data = &summary["data"];
        assert_eq!(data["totalReviews"], 2);
        assert_eq!(data["totalTokens"], 3000);
        assert_eq!(data["totalCost"].as_f64(), Some(0.0006));
        assert_eq!(data["averageLatencyMs"], 42);
        assert_eq!(data["successCount"], 2);
        assert_eq!(data["errorCount"], 0);
        assert_eq!(data["sentimentBreakdown"], json!({ "positive": 0, "neutral": 0, "negative": 2 }));
    }

    #[tokio::test]
    async fn metric_pagination_is_validated() {
        let (server, _bg) = create_test_app(Arc::new(StubProvider::succeeding()));
        let response = server.get("/api/review-metrics").add_query_param("offset", -5).await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["code"], "VALIDATION");
    }
}
