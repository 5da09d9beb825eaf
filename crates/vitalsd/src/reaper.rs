//! Termination report consumer.
//!
//! Drains the health monitor's report channel, logs why each checker
//! exited, and releases its slot in the monitor.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use vitals_health::{HealthMonitor, TerminationReason, TerminationReport};

/// Process reports until shutdown or until every sender is gone.
///
/// Reports already queued when shutdown is signalled are still handled.
/// Returns the number of reports processed.
pub async fn run(
    monitor: Arc<HealthMonitor>,
    mut reports: mpsc::Receiver<TerminationReport>,
    mut shutdown: watch::Receiver<bool>,
) -> usize {
    let mut processed = 0;

    loop {
        tokio::select! {
            biased;

            report = reports.recv() => {
                let Some(report) = report else { break };
                handle(&monitor, &report).await;
                processed += 1;
            }
            _ = shutdown.changed() => {
                while let Ok(report) = reports.try_recv() {
                    handle(&monitor, &report).await;
                    processed += 1;
                }
                info!(processed, "report reaper shutting down");
                break;
            }
        }
    }

    processed
}

async fn handle(monitor: &HealthMonitor, report: &TerminationReport) {
    let released = monitor.remove_terminated(report).await;
    match report.reason {
        TerminationReason::Unreachable => warn!(
            service = %report.registrant.service_name,
            address = %report.registrant.control_address,
            released,
            "registrant unreachable, removed from live set"
        ),
        TerminationReason::Stopped => info!(
            service = %report.registrant.service_name,
            released,
            "health check ended"
        ),
    }
}
