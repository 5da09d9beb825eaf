//! vitals-health — per-registrant health checking for Vitals.
//!
//! Probes each registered service's control endpoint on a fixed interval,
//! tolerates isolated failures, and reports a service as unreachable once
//! a budget of consecutive failed probe cycles is spent. Resource stats
//! returned by successful heartbeats are forwarded to a metrics sink.
//!
//! # Architecture
//!
//! ```text
//! HealthMonitor
//!   ├── HealthChecker task per registrant
//!   │   ├── ticker (first tick one interval after spawn)
//!   │   ├── RetryPolicy → HeartbeatClient::heartbeat()
//!   │   ├── bridge::forward() → MetricsSink
//!   │   └── TerminationReport → shared mpsc channel
//!   └── register / deregister / remove_terminated
//! ```
//!
//! # Failure budget
//!
//! A probe cycle is one heartbeat with up to `retry.max_attempts`
//! attempts and exponential backoff between them. Only a cycle that
//! exhausts its attempts, or succeeds without a payload, spends budget.
//! Any successful cycle refills it.

pub mod bridge;
pub mod checker;
pub mod client;
pub mod error;
pub mod monitor;
pub mod retry;

#[cfg(test)]
mod testing;

pub use checker::{
    CheckerState, HealthCheckConfig, HealthChecker, HealthCheckerHandle, TerminationReason,
    TerminationReport,
};
pub use client::{HeartbeatClient, HttpHeartbeatClient};
pub use error::{HeartbeatError, ProbeError};
pub use monitor::{ClientFactory, HealthMonitor, http_client_factory};
pub use retry::RetryPolicy;
