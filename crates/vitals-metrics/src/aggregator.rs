//! Metrics aggregator — accumulates data points per (metric, service).
//!
//! Any number of health checkers append concurrently. Each series keeps
//! at most `retention` samples; the oldest sample is dropped first.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use vitals_core::{DataPoint, MetricKind};

/// Destination for data points harvested from heartbeats.
///
/// Implementations must be safe for concurrent callers.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Append one data point.
    async fn add_data_point(&self, point: DataPoint);
}

/// One timestamped value within a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub ts: i64,
    pub value: f64,
}

type SeriesKey = (MetricKind, String);

/// In-memory aggregator with bounded per-series retention.
///
/// Cheap to clone; clones share the same storage.
#[derive(Clone)]
pub struct MetricsAggregator {
    series: Arc<RwLock<HashMap<SeriesKey, VecDeque<Sample>>>>,
    /// Samples kept per series.
    retention: usize,
    /// Data points accepted since creation (including evicted ones).
    accepted: Arc<AtomicU64>,
}

impl MetricsAggregator {
    /// Create an aggregator keeping up to `retention` samples per series.
    pub fn new(retention: usize) -> Self {
        Self {
            series: Arc::new(RwLock::new(HashMap::new())),
            retention: retention.max(1),
            accepted: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Samples for one series, oldest first.
    pub async fn series(&self, metric: MetricKind, service_id: &str) -> Vec<Sample> {
        let series = self.series.read().await;
        series
            .get(&(metric, service_id.to_string()))
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The most recent data point of every series, ordered by service then metric.
    pub async fn latest(&self) -> Vec<DataPoint> {
        let series = self.series.read().await;
        let mut points: Vec<DataPoint> = series
            .iter()
            .filter_map(|((metric, service_id), samples)| {
                samples
                    .back()
                    .map(|s| DataPoint::new(*metric, service_id.clone(), s.ts, s.value))
            })
            .collect();
        points.sort_by(|a, b| {
            a.service_id
                .cmp(&b.service_id)
                .then(a.metric.cmp(&b.metric))
        });
        points
    }

    /// Service ids with at least one sample, sorted.
    pub async fn services(&self) -> Vec<String> {
        let series = self.series.read().await;
        let ids: BTreeSet<&String> = series.keys().map(|(_, id)| id).collect();
        ids.into_iter().cloned().collect()
    }

    /// Drop every series belonging to a service.
    pub async fn remove_service(&self, service_id: &str) -> usize {
        let mut series = self.series.write().await;
        let before = series.len();
        series.retain(|(_, id), _| id != service_id);
        let removed = before - series.len();
        debug!(%service_id, series = removed, "removed metric series");
        removed
    }

    /// Total data points accepted since creation.
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Samples currently held across all series.
    pub async fn stored(&self) -> usize {
        let series = self.series.read().await;
        series.values().map(VecDeque::len).sum()
    }
}

#[async_trait]
impl MetricsSink for MetricsAggregator {
    async fn add_data_point(&self, point: DataPoint) {
        let mut series = self.series.write().await;
        let samples = series
            .entry((point.metric, point.service_id))
            .or_insert_with(VecDeque::new);
        if samples.len() == self.retention {
            samples.pop_front();
        }
        samples.push_back(Sample {
            ts: point.ts,
            value: point.value,
        });
        self.accepted.fetch_add(1, Ordering::Relaxed);
        trace!(metric = %point.metric, ts = point.ts, "data point stored");
    }
}
