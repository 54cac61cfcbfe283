//! API request/response models.

pub mod envelope;
pub mod health;
pub mod metrics;
pub mod pagination;
pub mod reviews;
pub mod usages;
