//! Read-only aggregation over stored metrics and reviews.

use std::sync::Arc;

use tracing::instrument;

use crate::db::handlers::MetricStore;
use crate::db::models::{
    metrics::{MetricSummary, ReviewMetric},
    page::{Page, PageRequest},
    reviews::SentimentBreakdown,
};
use crate::errors::Result;

/// Metric totals together with the sentiment split over all reviews.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsOverview {
    pub summary: MetricSummary,
    pub sentiment: SentimentBreakdown,
}

pub struct MetricAggregator {
    metrics: Arc<dyn MetricStore>,
}

impl MetricAggregator {
    pub fn new(metrics: Arc<dyn MetricStore>) -> Self {
        Self { metrics }
    }

    /// Newest metrics first.
    #[instrument(skip(self), err)]
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Page<ReviewMetric>> {
        let page = PageRequest::new(limit, offset)?;
        Ok(self.metrics.find_all(page).await?)
    }

    /// Summary and sentiment breakdown, queried concurrently.
    #[instrument(skip(self), err)]
    pub async fn overview(&self) -> Result<MetricsOverview> {
        let (summary, sentiment) = tokio::try_join!(self.metrics.summary(), self.metrics.sentiment_breakdown())?;
        Ok(MetricsOverview { summary, sentiment })
    }
}
