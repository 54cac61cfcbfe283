//! Configuration management for the review service.
//!
//! Configuration is loaded from a YAML file, then overridden by environment
//! variables:
//!
//! - `REVIEWCTL_`-prefixed variables, with `__` separating nested keys
//!   (e.g. `REVIEWCTL_PROVIDER__MODEL=gemini-2.5-flash`)
//! - `DATABASE_URL`, which switches the database to an external PostgreSQL
//!   at that URL while keeping any configured pool settings
//! - `GOOGLE_API_KEY`, used as the provider API key
//!
//! ```yaml
//! host: 0.0.0.0
//! port: 3000
//! database:
//!   type: external
//!   url: postgres://localhost:5432/reviews
//! provider:
//!   model: gemini-2.0-flash
//!   request_timeout: 60s
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::Error;

const DEFAULT_PROVIDER_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "REVIEWCTL_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Root configuration. Every field has a default, so an empty file is valid
/// apart from the provider API key.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Set from `DATABASE_URL`; folded into `database` on load
    #[serde(skip_serializing)]
    pub database_url: Option<String>,
    /// Set from `GOOGLE_API_KEY`; folded into `provider.api_key` on load
    #[serde(skip_serializing)]
    pub provider_api_key: Option<String>,
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
    pub metric_recorder: MetricRecorderConfig,
    pub cors: CorsConfig,
    /// Expose Prometheus metrics at `/internal/metrics`
    pub enable_metrics: bool,
    /// Export spans over OTLP, configured by the standard `OTEL_*` variables
    pub enable_otel_export: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            provider_api_key: None,
            database: DatabaseConfig::default(),
            provider: ProviderConfig::default(),
            metric_recorder: MetricRecorderConfig::default(),
            cors: CorsConfig::default(),
            enable_metrics: false,
            enable_otel_export: false,
        }
    }
}

/// Connection pool settings, passed straight to `PgPoolOptions`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,
    /// Time before idle connections are closed (seconds, 0 = never)
    pub idle_timeout_secs: u64,
    /// Maximum lifetime of a connection (seconds, 0 = never)
    pub max_lifetime_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

/// Where reviews, metrics and usages are stored.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatabaseConfig {
    /// External PostgreSQL database
    External {
        url: String,
        #[serde(default)]
        pool: PoolSettings,
    },
    /// Embedded PostgreSQL database (requires the `embedded-db` feature)
    Embedded {
        /// Data directory (default: .reviewctl_data/postgres)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data_dir: Option<PathBuf>,
        /// Keep data between restarts (default: ephemeral)
        #[serde(default)]
        persistent: bool,
        #[serde(default)]
        pool: PoolSettings,
    },
    /// In-process tables; everything is lost on shutdown
    Memory,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::External {
            url: "postgres://localhost:5432/reviews".to_string(),
            pool: PoolSettings::default(),
        }
    }
}

impl DatabaseConfig {
    pub fn is_embedded(&self) -> bool {
        matches!(self, DatabaseConfig::Embedded { .. })
    }

    pub fn embedded_data_dir(&self) -> Option<PathBuf> {
        match self {
            DatabaseConfig::Embedded { data_dir, .. } => data_dir.clone(),
            _ => None,
        }
    }

    pub fn embedded_persistent(&self) -> bool {
        match self {
            DatabaseConfig::Embedded { persistent, .. } => *persistent,
            _ => false,
        }
    }

    /// Pool settings of a PostgreSQL-backed configuration.
    pub fn pool_settings(&self) -> Option<&PoolSettings> {
        match self {
            DatabaseConfig::External { pool, .. } | DatabaseConfig::Embedded { pool, .. } => Some(pool),
            DatabaseConfig::Memory => None,
        }
    }
}

/// The OpenAI-compatible chat-completions endpoint used for analysis.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Reported as the review's model provider
    pub name: String,
    /// Model identifier sent with each request and reported as the model version
    pub model: String,
    pub base_url: Url,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "gemini".to_string(),
            model: "gemini-2.0-flash".to_string(),
            base_url: Url::parse(DEFAULT_PROVIDER_BASE_URL).expect("default provider URL is valid"),
            api_key: None,
            temperature: 0.3,
            max_output_tokens: 1000,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Background metric recorder settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricRecorderConfig {
    /// Metrics queued beyond this are dropped and counted
    pub queue_capacity: usize,
}

impl Default for MetricRecorderConfig {
    fn default() -> Self {
        Self { queue_capacity: 1024 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            max_age: None,
        }
    }
}

/// CORS origin: `*` or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        // DATABASE_URL wins over the file, keeping configured pool settings
        if let Some(url) = config.database_url.take() {
            let pool = config.database.pool_settings().cloned().unwrap_or_default();
            config.database = DatabaseConfig::External { url, pool };
        }
        if let Some(key) = config.provider_api_key.take() {
            config.provider.api_key = Some(key);
        }

        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("REVIEWCTL_").ignore(&["CONFIG"]).split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]))
            .merge(Env::raw().only(&["GOOGLE_API_KEY"]).map(|_| "provider_api_key".into()))
    }

    /// Check settings that deserialize fine but cannot work at runtime.
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |reason: &str| Error::Internal {
            operation: format!("Config validation: {reason}"),
        };

        if self.provider.api_key.as_deref().is_none_or(|key| key.trim().is_empty()) {
            return Err(invalid(
                "provider API key is not configured. Set GOOGLE_API_KEY or provider.api_key in the config file.",
            ));
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(invalid(&format!(
                "provider.temperature must be between 0 and 2, got {}",
                self.provider.temperature
            )));
        }
        if self.provider.max_output_tokens == 0 {
            return Err(invalid("provider.max_output_tokens must be greater than 0"));
        }
        if self.provider.model.trim().is_empty() {
            return Err(invalid("provider.model must not be empty"));
        }
        if self.metric_recorder.queue_capacity == 0 {
            return Err(invalid("metric_recorder.queue_capacity must be greater than 0"));
        }
        if self.database.is_embedded() && !cfg!(feature = "embedded-db") {
            return Err(invalid(
                "embedded database is configured but the embedded-db feature is not enabled",
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
