//! Background persistence of analysis metrics.
//!
//! Metric rows are telemetry: the analysis response must never wait on them
//! nor fail because of them. The orchestrator hands each row to a
//! [`MetricSink`], whose `record` returns `()` and cannot report failure. A
//! single [`MetricRecorder`] task owns the channel receiver and writes rows
//! to the [`MetricStore`], logging and discarding failures.
//!
//! ```text
//! AnalysisOrchestrator ──record()──► bounded mpsc ──► MetricRecorder ──► MetricStore
//!                        (try_send)                   (logs failures)
//! ```
//!
//! On shutdown the channel is closed and drained before the task exits, so
//! rows accepted before shutdown are still written.

use std::sync::Arc;

use metrics::counter;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::db::handlers::MetricStore;
use crate::db::models::metrics::ReviewMetric;
use crate::types::abbrev_uuid;

/// Fire-and-forget handle for submitting metric rows.
#[derive(Clone)]
pub struct MetricSink {
    sender: mpsc::Sender<ReviewMetric>,
}

impl MetricSink {
    /// Queue a metric for persistence. Never blocks and never fails: a full or
    /// closed queue drops the row with a warning.
    pub fn record(&self, metric: ReviewMetric) {
        match self.sender.try_send(metric) {
            Ok(()) => {}
            Err(TrySendError::Full(metric)) => {
                warn!(review_id = %abbrev_uuid(&metric.review_id), "Metric queue full, dropping metric");
                counter!("reviewctl_metric_records_dropped_total", "reason" => "queue_full").increment(1);
            }
            Err(TrySendError::Closed(metric)) => {
                warn!(review_id = %abbrev_uuid(&metric.review_id), "Metric recorder stopped, dropping metric");
                counter!("reviewctl_metric_records_dropped_total", "reason" => "closed").increment(1);
            }
        }
    }
}

pub struct MetricRecorder {
    store: Arc<dyn MetricStore>,
    receiver: mpsc::Receiver<ReviewMetric>,
}

impl MetricRecorder {
    /// Create a recorder and the sink that feeds it. `capacity` bounds the
    /// number of rows waiting to be written.
    pub fn new(store: Arc<dyn MetricStore>, capacity: usize) -> (Self, MetricSink) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { store, receiver }, MetricSink { sender })
    }

    /// Create a recorder and spawn it onto the runtime.
    pub fn spawn(store: Arc<dyn MetricStore>, capacity: usize) -> (MetricSink, RecorderHandle) {
        let (recorder, sink) = Self::new(store, capacity);
        let shutdown_token = CancellationToken::new();
        let task = tokio::spawn(recorder.run(shutdown_token.clone()));
        (sink, RecorderHandle { shutdown_token, task })
    }

    /// Write metrics until shutdown or until every sink is dropped.
    pub async fn run(mut self, shutdown_token: CancellationToken) {
        info!("Metric recorder started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_token.cancelled() => {
                    info!("Shutdown signal received, draining metric queue");
                    self.receiver.close();
                    while let Some(metric) = self.receiver.recv().await {
                        self.persist(metric).await;
                    }
                    info!("Metric recorder shutdown complete");
                    break;
                }

                maybe_metric = self.receiver.recv() => {
                    match maybe_metric {
                        Some(metric) => self.persist(metric).await,
                        None => {
                            info!("Metric channel closed, shutting down recorder");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn persist(&self, metric: ReviewMetric) {
        let review_id = metric.review_id;
        match self.store.save(metric).await {
            Ok(()) => debug!(review_id = %abbrev_uuid(&review_id), "Metric recorded"),
            Err(e) => {
                error!(error = %e, review_id = %abbrev_uuid(&review_id), "Failed to save review metric");
                counter!("reviewctl_metric_records_dropped_total", "reason" => "store_error").increment(1);
            }
        }
    }
}

/// Owns the spawned recorder task.
pub struct RecorderHandle {
    shutdown_token: CancellationToken,
    task: JoinHandle<()>,
}

impl RecorderHandle {
    /// Close the queue, write what is already queued, and wait for the task.
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();
        if let Err(e) = self.task.await {
            error!(error = %e, "Metric recorder task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{InMemoryStore, ReviewStore};
    use crate::db::models::metrics::MetricStatus;
    use crate::db::models::page::PageRequest;
    use crate::db::models::reviews::{Review, Sentiment};
    use crate::test_utils::FailingMetricStore;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    async fn seeded_store() -> (InMemoryStore, Review) {
        let store = InMemoryStore::new();
        let review = ReviewStore::save(
            &store,
            Review {
                id: Uuid::new_v4(),
                raw_text: "great".to_string(),
                summary: "praise".to_string(),
                sentiment: Sentiment::Positive,
                suggested_actions: vec![],
                suggested_response: "thanks".to_string(),
                model_provider: "stub".to_string(),
                model_version: "v1".to_string(),
                language: None,
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();
        (store, review)
    }

    fn metric_for(review: &Review) -> ReviewMetric {
        ReviewMetric {
            id: Uuid::new_v4(),
            review_id: review.id,
            input_tokens: 1,
            output_tokens: 1,
            total_tokens: 2,
            estimated_cost: Decimal::new(5, 7),
            latency_ms: 12,
            status: MetricStatus::Success,
            created_at: Utc::now(),
        }
    }

    #[test_log::test(tokio::test)]
    async fn shutdown_drains_queued_metrics() {
        let (store, review) = seeded_store().await;
        let (recorder, sink) = MetricRecorder::new(Arc::new(store.clone()), 16);

        // Queue before the task runs, then cancel immediately
        for _ in 0..3 {
            sink.record(metric_for(&review));
        }
        let token = CancellationToken::new();
        token.cancel();
        recorder.run(token).await;

        let page = MetricStore::find_all(&store, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 3);
    }

    #[test_log::test(tokio::test)]
    async fn store_failures_are_swallowed() {
        let (sink, handle) = MetricRecorder::spawn(Arc::new(FailingMetricStore), 4);
        let (_, review) = seeded_store().await;

        sink.record(metric_for(&review));
        sink.record(metric_for(&review));
        handle.shutdown().await;
    }

    #[test_log::test(tokio::test)]
    async fn full_queue_drops_without_blocking() {
        let (store, review) = seeded_store().await;
        let (recorder, sink) = MetricRecorder::new(Arc::new(store.clone()), 1);

        sink.record(metric_for(&review));
        sink.record(metric_for(&review));

        let token = CancellationToken::new();
        token.cancel();
        recorder.run(token).await;

        let page = MetricStore::find_all(&store, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[test_log::test(tokio::test)]
    async fn recording_after_shutdown_is_harmless() {
        let (store, review) = seeded_store().await;
        let (sink, handle) = MetricRecorder::spawn(Arc::new(store.clone()), 4);
        handle.shutdown().await;

        sink.record(metric_for(&review));
        let page = MetricStore::find_all(&store, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }
}
