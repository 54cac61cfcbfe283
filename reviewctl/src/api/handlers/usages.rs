use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::AppState;
use crate::api::models::envelope::{ApiResponse, Envelope, ErrorEnvelope};
use crate::api::models::pagination::{ListResponse, Pagination};
use crate::api::models::usages::{CreateReviewUsageRequest, ReviewUsageResponse};
use crate::errors::Result;

#[utoipa::path(
    get,
    path = "/api/review-usages",
    tag = "review-usages",
    summary = "List review usages, newest first",
    params(Pagination),
    responses(
        (status = 200, description = "Page of usages", body = Envelope<ListResponse<ReviewUsageResponse>>),
        (status = 400, description = "Invalid pagination", body = ErrorEnvelope),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_usages(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<ApiResponse<ListResponse<ReviewUsageResponse>>> {
    let page = state.usages.list(pagination.limit(), pagination.offset()).await?;
    Ok(ApiResponse::ok(ListResponse::from_page(page)))
}

#[utoipa::path(
    post,
    path = "/api/review-usages",
    tag = "review-usages",
    summary = "Record how an agent used a review",
    request_body = CreateReviewUsageRequest,
    responses(
        (status = 201, description = "Usage recorded", body = Envelope<ReviewUsageResponse>),
        (status = 400, description = "Missing reviewId", body = ErrorEnvelope),
        (status = 404, description = "Review not found", body = ErrorEnvelope),
        (status = 409, description = "The review already has a usage", body = ErrorEnvelope),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_usage(
    State(state): State<AppState>,
    Json(request): Json<CreateReviewUsageRequest>,
) -> Result<ApiResponse<ReviewUsageResponse>> {
    let usage = state.usages.create(request.into()).await?;
    Ok(ApiResponse::created(usage.into()))
}

#[utoipa::path(
    patch,
    path = "/api/review-usages/{review_id}/sent",
    tag = "review-usages",
    summary = "Mark a review's response as sent",
    params(("review_id" = String, Path, description = "Review id whose usage is updated")),
    responses(
        (status = 200, description = "Updated usage", body = Envelope<ReviewUsageResponse>),
        (status = 404, description = "No usage for this review", body = ErrorEnvelope),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn mark_usage_sent(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
) -> Result<ApiResponse<ReviewUsageResponse>> {
    let usage = state.usages.mark_as_sent(&review_id).await?;
    Ok(ApiResponse::ok(usage.into()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum_test::TestServer;
    use chrono::{DateTime, Utc};
    use serde_json::{Value, json};
    use uuid::Uuid;

    use crate::test_utils::{StubProvider, create_test_app};

    async fn create_review(server: &TestServer) -> String {
        let body: Value = server.post("/api/reviews").json(&json!({ "text": "Me cobraron dos veces" })).await.json();
        body["data"]["reviewId"].as_str().unwrap().to_string()
    }

    fn timestamp(value: &Value) -> DateTime<Utc> {
        value.as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn create_usage_returns_201() {
        let (server, _bg) = create_test_app(Arc::new(StubProvider::succeeding()));
        let review_id = create_review(&server).await;

        let response = server
            .post("/api/review-usages")
            .json(&json!({ "reviewId": review_id, "agentId": " agent-7 ", "editedResponse": "   " }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        let usage = &body["data"];
        assert_eq!(usage["reviewId"], review_id.as_str());
        assert_eq!(usage["agentId"], "agent-7");
        assert!(usage["editedResponse"].is_null());
        assert_eq!(usage["responseSent"], false);
        assert!(usage["sentAt"].is_null());
        assert!(Uuid::parse_str(usage["id"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn sent_on_creation_stamps_sent_at() {
        let (server, _bg) = create_test_app(Arc::new(StubProvider::succeeding()));
        let review_id = create_review(&server).await;

        let body: Value = server
            .post("/api/review-usages")
            .json(&json!({ "reviewId": review_id, "responseSent": true }))
            .await
            .json();
        assert_eq!(body["data"]["responseSent"], true);
        assert_eq!(body["data"]["sentAt"], body["data"]["createdAt"]);
    }

    #[tokio::test]
    async fn second_usage_for_same_review_conflicts() {
        let (server, _bg) = create_test_app(Arc::new(StubProvider::succeeding()));
        let review_id = create_review(&server).await;
        let payload = json!({ "reviewId": review_id });

        server.post("/api/review-usages").json(&payload).await.assert_status(StatusCode::CREATED);
        let response = server.post("/api/review-usages").json(&payload).await;

        response.assert_status(StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["code"], "ALREADY_EXISTS");
        assert!(body["data"].is_null());

        let list: Value = server.get("/api/review-usages").await.json();
        assert_eq!(list["data"]["total"], 1);
    }

    #[tokio::test]
    async fn usage_for_unknown_review_is_not_found() {
        let (server, _bg) = create_test_app(Arc::new(StubProvider::succeeding()));
        let response = server
            .post("/api/review-usages")
            .json(&json!({ "reviewId": Uuid::new_v4() }))
            .await;

        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn missing_review_id_is_validation() {
        let (server, _bg) = create_test_app(Arc::new(StubProvider::succeeding()));
        let response = server.post("/api/review-usages").json(&json!({ "agentId": "a" })).await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["code"], "VALIDATION");
        assert_eq!(body["error"], "reviewId is required");
    }

    #[tokio::test]
    async fn mark_as_sent_restamps_on_every_call() {
        let (server, _bg) = create_test_app(Arc::new(StubProvider::succeeding()));
        let review_id = create_review(&server).await;
        server
            .post("/api/review-usages")
            .json(&json!({ "reviewId": review_id }))
            .await
            .assert_status(StatusCode::CREATED);

        let first: Value = server.patch(&format!("/api/review-usages/{review_id}/sent")).await.json();
        assert_eq!(first["data"]["responseSent"], true);
        let first_sent = timestamp(&first["data"]["sentAt"]);

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = server.patch(&format!("/api/review-usages/{review_id}/sent")).await;
        second.assert_status_ok();
        let second: Value = second.json();
        assert!(timestamp(&second["data"]["sentAt"]) > first_sent);
        assert_eq!(second["data"]["id"], first["data"]["id"]);
    }

    #[tokio::test]
    async fn mark_as_sent_without_usage_is_not_found() {
        let (server, _bg) = create_test_app(Arc::new(StubProvider::succeeding()));
        let review_id = create_review(&server).await;

        let response = server.patch(&format!("/api/review-usages/{review_id}/sent")).await;
        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn wrong_method_is_an_enveloped_405() {
        let (server, _bg) = create_test_app(Arc::new(StubProvider::succeeding()));
        let response = server.delete("/api/review-usages").await;

        response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert!(response.headers().get(axum::http::header::ALLOW).is_some());
    }

    #[tokio::test]
    async fn unknown_route_is_enveloped_and_keeps_trace_id() {
        let (server, _bg) = create_test_app(Arc::new(StubProvider::succeeding()));
        let response = server.get("/api/nothing-here").add_header("x-trace-id", "trace-42").await;

        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["error"], "Route not found");
        assert_eq!(body["traceId"], "trace-42");
        assert_eq!(response.header("x-trace-id"), "trace-42");
    }
}
