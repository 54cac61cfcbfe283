//! # reviewctl: customer review analysis service
//!
//! `reviewctl` turns free-text customer comments into structured reviews with a
//! language model: a short summary, a sentiment (`POSITIVE`, `NEUTRAL`,
//! `NEGATIVE`), up to five suggested actions and a suggested reply. Every
//! analysis is persisted together with its token usage, estimated cost and
//! latency, and support agents can record how they used the suggested reply.
//!
//! ## Architecture
//!
//! ```text
//!  HTTP (axum) ── trace id + envelope middleware
//!     │
//!     ├─ /api/reviews         ──► AnalysisOrchestrator ──► AnalysisProvider (chat completions)
//!     │                                  │         └────► ReviewStore
//!     │                                  └── MetricSink ──► MetricRecorder task ──► MetricStore
//!     ├─ /api/review-metrics  ──► MetricAggregator ──► MetricStore
//!     └─ /api/review-usages   ──► UsageOrchestrator ──► ReviewStore + UsageStore
//! ```
//!
//! Storage is PostgreSQL through `sqlx` (external, or embedded with the
//! `embedded-db` feature), or in-process tables for `database.type: memory`.
//! The stores sit behind the traits in [`db::handlers`], so the orchestrators
//! never know which backend they run on.
//!
//! Every response, success or failure, uses one envelope:
//! `{success, data, error, code, traceId}`. See [`api::models::envelope`].
//!
//! ## Lifecycle
//!
//! [`Application::new`] opens the persistence handle, spawns the metric
//! recorder and builds the router. [`Application::serve`] runs until the
//! shutdown future resolves, then drains the recorder, closes storage and
//! flushes telemetry.

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod openapi;
pub mod provider;
pub mod reviews;
pub mod telemetry;
#[cfg(test)]
mod test_utils;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    http::{self, HeaderName, HeaderValue, Method},
    middleware::from_fn,
    routing::{get, patch, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api::handlers;
use crate::api::middleware::{TRACE_ID_HEADER, route_not_found, trace_and_envelope};
use crate::config::{Config, CorsOrigin};
use crate::db::Persistence;
use crate::openapi::ApiDoc;
use crate::provider::{AnalysisProvider, chat::ChatCompletionsProvider};
use crate::reviews::{AnalysisOrchestrator, MetricAggregator, MetricRecorder, RecorderHandle, UsageOrchestrator};

/// Shared state handed to every handler.
#[derive(Clone, Builder)]
pub struct AppState {
    pub analysis: Arc<AnalysisOrchestrator>,
    pub usages: Arc<UsageOrchestrator>,
    pub metrics: Arc<MetricAggregator>,
    pub config: Config,
}

/// Database migrations embedded at compile time.
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Install the process-wide rustls crypto provider. `reqwest` is built
/// without one, so this must run before the first HTTPS client is created.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origins = &config.cors.allowed_origins;
    let allow_origin = if origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut values = Vec::with_capacity(origins.len());
        for origin in origins {
            if let CorsOrigin::Url(url) = origin {
                values.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(values)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(TRACE_ID_HEADER), http::header::LOCATION]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the router: API routes, health, docs, fallback and middleware.
///
/// Layer order, outermost first: HTTP tracing, Prometheus (when enabled),
/// CORS, then the trace-id/envelope middleware, so even the fallback and
/// extractor rejections come out enveloped.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors_layer = create_cors_layer(&state.config)?;
    let enable_metrics = state.config.enable_metrics;

    let router = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/reviews", post(handlers::reviews::analyze_review))
        .route("/api/reviews/history", get(handlers::reviews::review_history))
        .route("/api/reviews/{id}", get(handlers::reviews::get_review))
        .route("/api/review-metrics", get(handlers::metrics::list_metrics))
        .route("/api/review-metrics/summary", get(handlers::metrics::metrics_summary))
        .route(
            "/api/review-usages",
            get(handlers::usages::list_usages).post(handlers::usages::create_usage),
        )
        .route("/api/review-usages/{review_id}/sent", patch(handlers::usages::mark_usage_sent))
        .with_state(state)
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()))
        .fallback(route_not_found)
        .layer(from_fn(trace_and_envelope))
        .layer(cors_layer);

    let router = if enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer)
    } else {
        router
    };

    Ok(router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    ))
}

/// Tasks running alongside the HTTP server.
pub struct BackgroundServices {
    recorder: RecorderHandle,
}

impl BackgroundServices {
    /// Drain the metric queue and wait for the recorder to exit.
    pub async fn shutdown(self) {
        self.recorder.shutdown().await;
    }
}

pub struct Application {
    router: Router,
    config: Config,
    persistence: Persistence,
    bg_services: BackgroundServices,
}

impl Application {
    /// Open storage, build the chat-completions provider and wire everything up.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!(
            bind = %config.bind_address(),
            provider = %config.provider.name,
            model = %config.provider.model,
            "Starting review service"
        );

        let provider = ChatCompletionsProvider::new(&config.provider)?;
        let persistence = Persistence::open(&config.database).await?;

        Self::with_parts(config, persistence, Arc::new(provider))
    }

    /// Wire an application from already-built parts. Spawns the metric
    /// recorder, so it must be called inside a Tokio runtime.
    pub fn with_parts(config: Config, persistence: Persistence, provider: Arc<dyn AnalysisProvider>) -> anyhow::Result<Self> {
        let (sink, recorder) = MetricRecorder::spawn(persistence.metrics.clone(), config.metric_recorder.queue_capacity);

        let state = AppState::builder()
            .analysis(Arc::new(AnalysisOrchestrator::new(provider, persistence.reviews.clone(), sink)))
            .usages(Arc::new(UsageOrchestrator::new(persistence.reviews.clone(), persistence.usages.clone())))
            .metrics(Arc::new(MetricAggregator::new(persistence.metrics.clone())))
            .config(config.clone())
            .build();

        let router = build_router(state)?;

        Ok(Self {
            router,
            config,
            persistence,
            bg_services: BackgroundServices { recorder },
        })
    }

    #[cfg(test)]
    pub fn into_test_server(self) -> (axum_test::TestServer, BackgroundServices) {
        let server = axum_test::TestServer::new(self.router).expect("Failed to create test server");
        (server, self.bg_services)
    }

    /// Serve until `shutdown` resolves, then release every resource in order.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("Review service listening on http://{}", listener.local_addr()?);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Draining metric recorder...");
        self.bg_services.shutdown().await;

        info!("Closing storage...");
        self.persistence.close().await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
