//! vitals-metrics — resource-utilization metrics for monitored services.
//!
//! Accepts data points from the health checkers, keeps a bounded window
//! of samples per (metric, service) series, and renders the latest values
//! in Prometheus text exposition format.
//!
//! # Architecture
//!
//! ```text
//! MetricsSink (trait)
//!   └── add_data_point() ← called by every health checker
//!
//! MetricsAggregator: MetricsSink
//!   ├── series() / latest() → queries
//!   └── bounded VecDeque per (MetricKind, service_id)
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics endpoint
//! ```

pub mod aggregator;
pub mod prometheus;

pub use aggregator::{MetricsAggregator, MetricsSink, Sample};
pub use prometheus::render_prometheus;
