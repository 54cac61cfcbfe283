use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::AppState;
use crate::api::models::envelope::{ApiResponse, Envelope, ErrorEnvelope};
use crate::api::models::pagination::{ListResponse, Pagination};
use crate::api::models::reviews::{AnalyzeReviewRequest, ReviewDetailResponse, ReviewHistoryItem, ReviewResponse};
use crate::errors::Result;

#[utoipa::path(
    post,
    path = "/api/reviews",
    tag = "reviews",
    summary = "Analyze a customer comment",
    description = "Runs the comment through the analysis provider, stores the review and returns it.",
    request_body = AnalyzeReviewRequest,
    responses(
        (status = 200, description = "Analysis stored", body = Envelope<ReviewResponse>),
        (status = 400, description = "Blank text or malformed body", body = ErrorEnvelope),
        (status = 500, description = "Provider or storage failure", body = ErrorEnvelope),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn analyze_review(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeReviewRequest>,
) -> Result<ApiResponse<ReviewResponse>> {
    let review = state.analysis.analyze(request.into()).await?;
    Ok(ApiResponse::ok(review.into()))
}

#[utoipa::path(
    get,
    path = "/api/reviews/history",
    tag = "reviews",
    summary = "List analyzed reviews, newest first",
    params(Pagination),
    responses(
        (status = 200, description = "Page of reviews", body = Envelope<ListResponse<ReviewHistoryItem>>),
        (status = 400, description = "Invalid pagination", body = ErrorEnvelope),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn review_history(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<ApiResponse<ListResponse<ReviewHistoryItem>>> {
    let page = state.analysis.history(pagination.limit(), pagination.offset()).await?;
    Ok(ApiResponse::ok(ListResponse::from_page(page)))
}

#[utoipa::path(
    get,
    path = "/api/reviews/{id}",
    tag = "reviews",
    summary = "Get a review",
    params(("id" = String, Path, description = "Review id")),
    responses(
        (status = 200, description = "The review with its original text", body = Envelope<ReviewDetailResponse>),
        (status = 404, description = "No such review", body = ErrorEnvelope),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_review(State(state): State<AppState>, Path(id): Path<String>) -> Result<ApiResponse<ReviewDetailResponse>> {
    let review = state.analysis.find_by_id(&id).await?;
    Ok(ApiResponse::ok(review.into()))
}
