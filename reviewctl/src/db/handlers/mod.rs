//! Store implementations for persistence.
//!
//! The orchestrators in [`crate::reviews`] only see the traits in
//! [`repository`]; the composition root decides which backend fills them.
//!
//! ```text
//!             ┌──────────────────────────────┐
//!             │ ReviewStore / MetricStore /  │
//!             │ UsageStore (async traits)    │
//!             └──────────────┬───────────────┘
//!                  ┌─────────┴──────────┐
//!                  ▼                    ▼
//!     Reviews / ReviewMetrics /    InMemoryStore
//!     ReviewUsages (PgPool)        (parking_lot RwLock)
//! ```
//!
//! # Available Stores
//!
//! - [`Reviews`]: analyzed comments, lookup by id and newest-first history
//! - [`ReviewMetrics`]: per-attempt telemetry, summary and sentiment breakdown
//! - [`ReviewUsages`]: agent usage, guarded by a unique `review_id` constraint
//! - [`InMemoryStore`]: all three traits over process memory
//!
//! PostgreSQL stores wrap a cloned `PgPool`, so each call checks out its own
//! connection and independent entities are written concurrently.

pub mod in_memory;
pub mod metrics;
pub mod repository;
pub mod reviews;
pub mod usages;

pub use in_memory::InMemoryStore;
pub use metrics::ReviewMetrics;
pub use repository::{MetricStore, ReviewStore, UsageStore};
pub use reviews::Reviews;
pub use usages::ReviewUsages;
