//! The uniform response envelope.
//!
//! ```json
//! { "success": true, "data": { ... }, "error": null, "code": null, "traceId": "req-..." }
//! { "success": false, "data": null, "error": "text is required", "code": "VALIDATION", "traceId": "req-..." }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::middleware::{Enveloped, current_trace_id};

/// Machine-readable error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// 400: malformed or missing input
    Validation,
    /// 404: referenced entity absent
    NotFound,
    /// 409: uniqueness violation
    AlreadyExists,
    /// 500: anything unanticipated
    InternalError,
}

impl ErrorCode {
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::NOT_FOUND => ErrorCode::NotFound,
            StatusCode::CONFLICT => ErrorCode::AlreadyExists,
            s if s.is_client_error() => ErrorCode::Validation,
            _ => ErrorCode::InternalError,
        }
    }
}

/// Successful response wrapper.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub code: Option<ErrorCode>,
    pub trace_id: String,
}

impl<T> Envelope<T> {
    pub fn success(data: T, trace_id: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
            trace_id,
        }
    }
}

/// Failure response wrapper; `data` is always null.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub success: bool,
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
    pub error: String,
    pub code: ErrorCode,
    pub trace_id: String,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>, code: ErrorCode, trace_id: String) -> Self {
        Self {
            success: false,
            data: None,
            error: error.into(),
            code,
            trace_id,
        }
    }

    /// Render with the given status and mark the response as already enveloped.
    pub fn into_response_with(self, status: StatusCode) -> Response {
        let mut response = (status, Json(self)).into_response();
        response.extensions_mut().insert(Enveloped);
        response
    }
}

/// Handler return type that wraps `data` in a success envelope.
pub struct ApiResponse<T> {
    status: StatusCode,
    data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope::success(self.data, current_trace_id());
        let mut response = (self.status, Json(body)).into_response();
        response.extensions_mut().insert(Enveloped);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn codes_follow_status() {
        assert_eq!(ErrorCode::from_status(StatusCode::BAD_REQUEST), ErrorCode::Validation);
        assert_eq!(ErrorCode::from_status(StatusCode::UNPROCESSABLE_ENTITY), ErrorCode::Validation);
        assert_eq!(ErrorCode::from_status(StatusCode::METHOD_NOT_ALLOWED), ErrorCode::Validation);
        assert_eq!(ErrorCode::from_status(StatusCode::NOT_FOUND), ErrorCode::NotFound);
        assert_eq!(ErrorCode::from_status(StatusCode::CONFLICT), ErrorCode::AlreadyExists);
        assert_eq!(ErrorCode::from_status(StatusCode::BAD_GATEWAY), ErrorCode::InternalError);
    }

    #[test]
    fn envelopes_serialize_all_keys() {
        let ok = serde_json::to_value(Envelope::success(json!({"a": 1}), "req-1".to_string())).unwrap();
        assert_eq!(
            ok,
            json!({"success": true, "data": {"a": 1}, "error": null, "code": null, "traceId": "req-1"})
        );

        let err = serde_json::to_value(ErrorEnvelope::new("nope", ErrorCode::AlreadyExists, "req-2".to_string())).unwrap();
        assert_eq!(
            err,
            json!({"success": false, "data": null, "error": "nope", "code": "ALREADY_EXISTS", "traceId": "req-2"})
        );
    }
}
