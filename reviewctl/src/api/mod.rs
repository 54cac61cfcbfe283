//! HTTP surface: handlers, DTOs and the response envelope.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: request/response bodies, pagination and the envelope
//! - **[`middleware`]**: trace ids and envelope enforcement
//!
//! # Routes
//!
//! - **Reviews** (`/api/reviews/*`): analyze a comment, history, detail
//! - **Metrics** (`/api/review-metrics/*`): per-analysis telemetry and summary
//! - **Usages** (`/api/review-usages/*`): agent usage of suggested responses
//! - **Health** (`/health`)
//!
//! Every response body under these routes is the envelope
//! `{success, data, error, code, traceId}`. Documentation is served at
//! `/api/docs`.

pub mod handlers;
pub mod middleware;
pub mod models;
