//! Embedded PostgreSQL database support
//!
//! Runs a bundled PostgreSQL instance that starts and stops with the service,
//! for single-binary deployments without an external database. Only available
//! when built with the `embedded-db` feature.

#[cfg(feature = "embedded-db")]
use postgresql_embedded::{PostgreSQL, Settings, V16};
#[cfg(feature = "embedded-db")]
use std::path::PathBuf;
#[cfg(feature = "embedded-db")]
use tracing::{debug, info};

#[cfg(feature = "embedded-db")]
const DATABASE_NAME: &str = "reviews";

#[cfg(feature = "embedded-db")]
pub struct EmbeddedDatabase {
    postgres: PostgreSQL,
    connection_string: String,
}

#[cfg(feature = "embedded-db")]
impl EmbeddedDatabase {
    /// Create and start a new embedded PostgreSQL instance on an OS-assigned port.
    ///
    /// `data_dir` defaults to `$HOME/.reviewctl_data/postgres`. With
    /// `persistent = false` the data directory is discarded on stop.
    pub async fn start(data_dir: Option<PathBuf>, persistent: bool) -> anyhow::Result<Self> {
        let data_dir = data_dir.unwrap_or_else(|| match std::env::home_dir() {
            Some(home) => home.join(".reviewctl_data").join("postgres"),
            None => PathBuf::from("reviewctl_data/postgres"),
        });

        if persistent {
            debug!("Starting embedded PostgreSQL with data directory: {}", data_dir.display());
        } else {
            debug!("Starting ephemeral embedded PostgreSQL");
        }

        let settings = Settings {
            version: V16.clone(),
            port: 0,
            username: "postgres".to_string(),
            password: "password".to_string(),
            temporary: !persistent,
            installation_dir: data_dir.join("installation"),
            data_dir: data_dir.join("data"),
            ..Default::default()
        };

        let mut postgres = PostgreSQL::new(settings);
        postgres
            .setup()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to setup embedded PostgreSQL: {}", e))?;
        postgres
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start embedded PostgreSQL: {}", e))?;

        if !postgres
            .database_exists(DATABASE_NAME)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to inspect embedded PostgreSQL: {}", e))?
        {
            postgres
                .create_database(DATABASE_NAME)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create database '{}': {}", DATABASE_NAME, e))?;
        }

        let connection_string = postgres.settings().url(DATABASE_NAME);
        info!("Embedded PostgreSQL started on port {}", postgres.settings().port);

        Ok(Self {
            postgres,
            connection_string,
        })
    }

    /// Get the connection string for this embedded database
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Stop the embedded PostgreSQL instance
    pub async fn stop(self) -> anyhow::Result<()> {
        info!("Stopping embedded PostgreSQL...");
        self.postgres
            .stop()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to stop embedded PostgreSQL: {}", e))?;
        info!("Embedded PostgreSQL stopped");
        Ok(())
    }
}

#[cfg(not(feature = "embedded-db"))]
pub struct EmbeddedDatabase;

#[cfg(not(feature = "embedded-db"))]
impl EmbeddedDatabase {
    pub async fn stop(self) -> anyhow::Result<()> {
        Ok(())
    }
}
