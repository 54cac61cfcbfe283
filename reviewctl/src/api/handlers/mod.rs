//! HTTP request handlers, one module per resource.
//!
//! Handlers only translate between the wire and the orchestrators in
//! [`crate::reviews`]: extract, delegate, wrap the result in
//! [`ApiResponse`](crate::api::models::envelope::ApiResponse). Failures are
//! [`crate::errors::Error`] values, rendered as the failure envelope.
//!
//! - [`reviews`]: analyze a comment, review history, review detail
//! - [`metrics`]: per-analysis metrics and their summary
//! - [`usages`]: record and update how agents used a suggested response
//! - [`health`]: liveness

pub mod health;
pub mod metrics;
pub mod reviews;
pub mod usages;
