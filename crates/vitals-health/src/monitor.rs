//! Health monitor — owns one health checker per registered service.
//!
//! The registry side calls [`HealthMonitor::register`] when a service is
//! admitted and [`HealthMonitor::deregister`] when it leaves. Every
//! checker reports its exit on the shared channel returned by
//! [`HealthMonitor::new`]; the consumer passes each report back to
//! [`HealthMonitor::remove_terminated`] to reclaim the slot.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use vitals_core::RegistrantInfo;
use vitals_metrics::MetricsSink;

use crate::checker::{HealthCheckConfig, HealthChecker, HealthCheckerHandle, TerminationReport};
use crate::client::{HeartbeatClient, HttpHeartbeatClient};
use crate::error::HeartbeatError;

/// Builds the heartbeat client for a registrant.
pub type ClientFactory =
    Arc<dyn Fn(&RegistrantInfo) -> Result<Arc<dyn HeartbeatClient>, HeartbeatError> + Send + Sync>;

/// Factory producing [`HttpHeartbeatClient`]s for the registrant's control address.
pub fn http_client_factory() -> ClientFactory {
    Arc::new(|info: &RegistrantInfo| {
        let client = HttpHeartbeatClient::new(&info.control_address)?;
        Ok(Arc::new(client) as Arc<dyn HeartbeatClient>)
    })
}

/// Manages health checkers for all registered services.
pub struct HealthMonitor {
    sink: Arc<dyn MetricsSink>,
    factory: ClientFactory,
    config: HealthCheckConfig,
    reports: mpsc::Sender<TerminationReport>,
    /// Active checkers: service_name → handle.
    checkers: Arc<RwLock<HashMap<String, HealthCheckerHandle>>>,
}

impl HealthMonitor {
    /// Create a monitor and the receiving end of its termination reports.
    ///
    /// `report_buffer` bounds the report queue; a terminating checker waits
    /// for room, other checkers are unaffected.
    pub fn new(
        sink: Arc<dyn MetricsSink>,
        factory: ClientFactory,
        config: HealthCheckConfig,
        report_buffer: usize,
    ) -> (Self, mpsc::Receiver<TerminationReport>) {
        let (tx, rx) = mpsc::channel(report_buffer.max(1));
        let monitor = Self {
            sink,
            factory,
            config,
            reports: tx,
            checkers: Arc::new(RwLock::new(HashMap::new())),
        };
        (monitor, rx)
    }

    /// Start checking a service. A checker already running under the same
    /// service name is stopped and replaced.
    pub async fn register(&self, info: RegistrantInfo) -> Result<u64, HeartbeatError> {
        let client = (self.factory)(&info)?;
        let handle = HealthChecker::spawn(
            info.clone(),
            client,
            self.sink.clone(),
            self.reports.clone(),
            self.config,
        );
        let id = handle.id();

        let mut checkers = self.checkers.write().await;
        if let Some(old) = checkers.insert(info.service_name.clone(), handle) {
            debug!(service = %info.service_name, old = %old.registrant(), "replacing health checker");
            let _ = old.stop();
        }

        info!(service = %info.service_name, address = %info.control_address, "health monitor registered");
        Ok(id)
    }

    /// Stop checking a service. Returns false if it was not monitored.
    pub async fn deregister(&self, service_name: &str) -> bool {
        let mut checkers = self.checkers.write().await;
        match checkers.remove(service_name) {
            Some(handle) => {
                let _ = handle.stop();
                info!(service = %service_name, "health monitor deregistered");
                true
            }
            None => false,
        }
    }

    /// Forget the checker that sent `report`, if it is still the current one.
    pub async fn remove_terminated(&self, report: &TerminationReport) -> bool {
        let mut checkers = self.checkers.write().await;
        let current = checkers
            .get(&report.registrant.service_name)
            .is_some_and(|h| h.id() == report.checker_id);
        if current {
            checkers.remove(&report.registrant.service_name);
            debug!(service = %report.registrant.service_name, reason = ?report.reason, "health checker slot released");
        }
        current
    }

    /// Stop all checkers (for graceful shutdown).
    ///
    /// Returns once every stopped checker has exited, so each one's
    /// termination report is already queued. The report receiver must be
    /// drained concurrently when more checkers are running than the
    /// report buffer holds.
    pub async fn stop_all(&self) -> usize {
        let stopping: Vec<_> = {
            let mut checkers = self.checkers.write().await;
            checkers
                .drain()
                .map(|(name, handle)| (name, handle.stop()))
                .collect()
        };

        let count = stopping.len();
        for (name, task) in stopping {
            if let Err(e) = task.await {
                warn!(service = %name, error = %e, "health checker task failed");
            }
            debug!(service = %name, "health checker stopped");
        }
        info!(count, "all health checkers stopped");
        count
    }

    /// Registrants with an active checker, sorted by service name.
    pub async fn active(&self) -> Vec<RegistrantInfo> {
        let checkers = self.checkers.read().await;
        let mut active: Vec<RegistrantInfo> =
            checkers.values().map(|h| h.registrant().clone()).collect();
        active.sort_by(|a, b| a.service_name.cmp(&b.service_name));
        active
    }

    pub async fn is_monitoring(&self, service_name: &str) -> bool {
        let checkers = self.checkers.read().await;
        checkers.contains_key(service_name)
    }
}
