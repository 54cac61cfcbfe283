//! Trace-id propagation and failure-envelope normalization.
//!
//! Every request runs inside a task-local trace id, taken from the `x-trace-id`
//! header or generated as `req-<uuid>`. Envelopes built while handling the
//! request read it through [`current_trace_id`], and the response echoes it back
//! in the same header.
//!
//! Responses produced by the typed error or [`ApiResponse`](crate::api::models::envelope::ApiResponse)
//! carry the [`Enveloped`] extension. Anything else with an error status (axum
//! extractor rejections, 405s, the router fallback) is rewritten here into the
//! failure envelope so clients only ever see one shape.

use axum::{
    body::{Body, to_bytes},
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::api::models::envelope::{ErrorCode, ErrorEnvelope};

pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Upper bound on how much of a bare error body is read back as the message.
const MAX_REWRITE_BODY_BYTES: usize = 16 * 1024;

tokio::task_local! {
    static TRACE_ID: String;
}

/// Response extension marking a body that is already in envelope form.
#[derive(Debug, Clone, Copy)]
pub struct Enveloped;

pub fn generate_trace_id() -> String {
    format!("req-{}", Uuid::new_v4().simple())
}

/// Trace id of the request being handled, or a fresh one outside a request scope.
pub fn current_trace_id() -> String {
    TRACE_ID.try_with(Clone::clone).unwrap_or_else(|_| generate_trace_id())
}

fn incoming_trace_id(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[instrument(skip_all, fields(path = %request.uri().path(), method = %request.method(), trace_id))]
pub async fn trace_and_envelope(request: Request<Body>, next: Next) -> Response {
    let trace_id = incoming_trace_id(&request).unwrap_or_else(generate_trace_id);
    tracing::Span::current().record("trace_id", trace_id.as_str());

    let mut response = TRACE_ID
        .scope(trace_id.clone(), async move {
            let response = next.run(request).await;
            envelope_bare_error(response).await
        })
        .await;

    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}

/// Rewrite an error response that bypassed the typed error into a failure envelope.
async fn envelope_bare_error(response: Response) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || response.extensions().get::<Enveloped>().is_some() {
        return response;
    }

    let (parts, body) = response.into_parts();
    let (status, message) = match status {
        s if s.is_server_error() => (s, "Internal server error".to_string()),
        StatusCode::NOT_FOUND => (status, "Route not found".to_string()),
        StatusCode::METHOD_NOT_ALLOWED => (status, "Method not allowed".to_string()),
        StatusCode::CONFLICT => (status, body_message(body, status).await),
        // Extractor rejections (415, 422, ...) are all input problems
        _ => (StatusCode::BAD_REQUEST, body_message(body, status).await),
    };
    debug!(%status, %message, "Rewriting bare error response into envelope");

    let mut rewritten = ErrorEnvelope::new(message, ErrorCode::from_status(status), current_trace_id()).into_response_with(status);
    if let Some(allow) = parts.headers.get(header::ALLOW) {
        rewritten.headers_mut().insert(header::ALLOW, allow.clone());
    }
    rewritten
}

async fn body_message(body: Body, status: StatusCode) -> String {
    let fallback = || status.canonical_reason().unwrap_or("Invalid request").to_string();
    match to_bytes(body, MAX_REWRITE_BODY_BYTES).await {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes).trim().to_string();
            if text.is_empty() { fallback() } else { text }
        }
        Err(_) => fallback(),
    }
}

/// Router fallback for unknown paths.
pub async fn route_not_found() -> impl IntoResponse {
    ErrorEnvelope::new("Route not found", ErrorCode::NotFound, current_trace_id()).into_response_with(StatusCode::NOT_FOUND)
}
