//! Persistence layer: store traits, backends and the lifecycle handle.
//!
//! ```text
//!   Config.database ──► Persistence::open ──┬─► external PostgreSQL (PgPool + migrations)
//!                                           ├─► embedded PostgreSQL (feature `embedded-db`)
//!                                           └─► in-memory tables
//!
//!   Persistence { reviews, metrics, usages }  ──► handed to the orchestrators
//!   Persistence::close                         ──► pool close, embedded stop
//! ```
//!
//! # Modules
//!
//! - [`errors`]: [`errors::DbError`] and the `sqlx::Error` mapping
//! - [`models`]: row structs and the pagination window
//! - [`handlers`]: the store traits plus PostgreSQL and in-memory implementations
//! - [`embedded`]: embedded PostgreSQL support (optional feature)
//!
//! There is no process-global connection: the composition root opens one
//! [`Persistence`] at startup and closes it on shutdown.

pub mod embedded;
pub mod errors;
pub mod handlers;
pub mod models;

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::config::{DatabaseConfig, PoolSettings};
use crate::migrator;
use embedded::EmbeddedDatabase;
use handlers::{InMemoryStore, MetricStore, ReviewMetrics, ReviewStore, ReviewUsages, Reviews, UsageStore};

/// Explicitly owned storage handles with an open/close lifecycle.
pub struct Persistence {
    pub reviews: Arc<dyn ReviewStore>,
    pub metrics: Arc<dyn MetricStore>,
    pub usages: Arc<dyn UsageStore>,
    pool: Option<PgPool>,
    embedded: Option<EmbeddedDatabase>,
}

impl Persistence {
    /// Connect to the configured backend and bring its schema up to date.
    pub async fn open(config: &DatabaseConfig) -> anyhow::Result<Self> {
        match config {
            DatabaseConfig::Memory => {
                info!("Using in-memory storage; data will be lost on shutdown");
                Ok(Self::in_memory())
            }
            DatabaseConfig::External { url, pool } => {
                info!("Using external database");
                let pg = connect_pool(url, pool).await?;
                Ok(Self::postgres(pg, None))
            }
            DatabaseConfig::Embedded { pool, .. } => {
                let persistent = config.embedded_persistent();
                info!("Starting with embedded database (persistent: {})", persistent);
                #[cfg(feature = "embedded-db")]
                {
                    let embedded = EmbeddedDatabase::start(config.embedded_data_dir(), persistent).await?;
                    let pg = connect_pool(embedded.connection_string(), pool).await?;
                    Ok(Self::postgres(pg, Some(embedded)))
                }
                #[cfg(not(feature = "embedded-db"))]
                {
                    let _ = pool;
                    anyhow::bail!(
                        "Embedded database is configured but the feature is not enabled. \
                         Rebuild with --features embedded-db to use embedded database."
                    );
                }
            }
        }
    }

    /// Stores backed by process memory.
    pub fn in_memory() -> Self {
        let store = InMemoryStore::new();
        Self {
            reviews: Arc::new(store.clone()),
            metrics: Arc::new(store.clone()),
            usages: Arc::new(store),
            pool: None,
            embedded: None,
        }
    }

    /// Stores over an already-migrated PostgreSQL pool.
    pub fn postgres(pool: PgPool, embedded: Option<EmbeddedDatabase>) -> Self {
        Self {
            reviews: Arc::new(Reviews::new(pool.clone())),
            metrics: Arc::new(ReviewMetrics::new(pool.clone())),
            usages: Arc::new(ReviewUsages::new(pool.clone())),
            pool: Some(pool),
            embedded,
        }
    }

    /// Close the pool and stop the embedded database, if any.
    pub async fn close(self) -> anyhow::Result<()> {
        if let Some(pool) = self.pool {
            pool.close().await;
            info!("Database connections closed");
        }
        if let Some(embedded) = self.embedded {
            embedded.stop().await?;
        }
        Ok(())
    }
}

async fn connect_pool(url: &str, settings: &PoolSettings) -> anyhow::Result<PgPool> {
    let non_zero = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(non_zero(settings.idle_timeout_secs))
        .max_lifetime(non_zero(settings.max_lifetime_secs))
        .connect(url)
        .await?;

    migrator().run(&pool).await?;
    info!("Database migrations applied");

    Ok(pool)
}
