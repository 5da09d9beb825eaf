//! Domain types shared by the health checker and the metrics aggregator.
//!
//! The heartbeat types double as the JSON wire format spoken with a
//! registrant's control endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Registrant ────────────────────────────────────────────────────

/// Identity of a monitored service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistrantInfo {
    pub service_name: String,
    /// Control endpoint (host:port) probed by the health checker.
    pub control_address: String,
}

impl RegistrantInfo {
    pub fn new(service_name: impl Into<String>, control_address: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            control_address: control_address.into(),
        }
    }
}

impl fmt::Display for RegistrantInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.service_name, self.control_address)
    }
}

// ── Heartbeat ─────────────────────────────────────────────────────

/// Heartbeat request. Carries no payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatRequest {}

/// Heartbeat response: one stats sample per reporting service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    #[serde(default)]
    pub stats: Vec<Stats>,
}

/// Resource-utilization sample reported by one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub service_id: String,
    /// Reporter-side timestamp.
    pub ts: i64,
    pub cpu: f64,
    #[serde(alias = "mem")]
    pub memory: f64,
    pub threads: u64,
    /// Lightweight concurrency units (goroutines, tasks, fibers).
    #[serde(alias = "num_goroutines")]
    pub concurrency_units: u64,
}

// ── Metrics ───────────────────────────────────────────────────────

/// Kind of metric carried by a [`DataPoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Cpu,
    Memory,
    Threads,
    ConcurrencyUnits,
}

impl MetricKind {
    /// Every kind, in the order data points are produced.
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Cpu,
        MetricKind::Memory,
        MetricKind::Threads,
        MetricKind::ConcurrencyUnits,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Cpu => "cpu",
            MetricKind::Memory => "memory",
            MetricKind::Threads => "threads",
            MetricKind::ConcurrencyUnits => "concurrency_units",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single metric observation for the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub metric: MetricKind,
    pub service_id: String,
    pub ts: i64,
    pub value: f64,
}

impl DataPoint {
    pub fn new(metric: MetricKind, service_id: impl Into<String>, ts: i64, value: f64) -> Self {
        Self {
            metric,
            service_id: service_id.into(),
            ts,
            value,
        }
    }
}
