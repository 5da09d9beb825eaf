//! Health checker — the per-registrant failure-detection loop.
//!
//! Each checker owns a ticker, a failure budget and a stop signal. On
//! every tick it runs one probe cycle (heartbeat wrapped in the retry
//! policy). A successful cycle refills the budget and forwards the
//! reported stats to the metrics sink; a failed cycle spends one unit of
//! budget. When the budget reaches zero, or a stop is requested, the
//! checker emits exactly one [`TerminationReport`] and exits.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use vitals_core::config::{
    DEFAULT_INTERVAL, DEFAULT_MAX_HEARTBEAT_RETRIES, DEFAULT_PROBE_TIMEOUT, MAX_DURATION,
};
use vitals_core::{ConfigError, HeartbeatRequest, RegistrantInfo, VitalsConfig};
use vitals_metrics::MetricsSink;

use crate::bridge;
use crate::client::HeartbeatClient;
use crate::error::{HeartbeatError, ProbeError};
use crate::retry::RetryPolicy;

/// Construction parameters for a health checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthCheckConfig {
    /// Time between probe cycles. The first cycle runs one interval after spawn.
    pub interval: Duration,
    /// Consecutive failed probe cycles tolerated before giving up.
    pub max_heartbeat_retries: u32,
    /// Backoff applied within a single probe cycle.
    pub retry: RetryPolicy,
    /// Deadline for each individual heartbeat attempt.
    pub probe_timeout: Duration,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_heartbeat_retries: DEFAULT_MAX_HEARTBEAT_RETRIES,
            retry: RetryPolicy::default(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl HealthCheckConfig {
    pub fn from_config(config: &VitalsConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            interval: config.health.interval()?,
            max_heartbeat_retries: config.health.max_heartbeat_retries(),
            retry: RetryPolicy::new(config.retry.max_attempts(), config.retry.base_delay()?),
            probe_timeout: config.health.probe_timeout()?,
        })
    }
}

/// Lifecycle of a checker. `Terminated` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckerState {
    Running,
    Stopping,
    Terminated,
}

/// Why a checker exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// A stop was requested (normal deregistration).
    Stopped,
    /// The failure budget was exhausted.
    Unreachable,
}

/// Emitted once per checker when it exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationReport {
    pub registrant: RegistrantInfo,
    pub reason: TerminationReason,
    /// Id of the checker that sent the report, see [`HealthCheckerHandle::id`].
    pub checker_id: u64,
}

static NEXT_CHECKER_ID: AtomicU64 = AtomicU64::new(1);

/// The state owned by one checker task.
pub struct HealthChecker {
    id: u64,
    info: RegistrantInfo,
    client: Arc<dyn HeartbeatClient>,
    sink: Arc<dyn MetricsSink>,
    reports: mpsc::Sender<TerminationReport>,
    config: HealthCheckConfig,
    state: watch::Sender<CheckerState>,
    /// Failed cycles left before the registrant is declared unreachable.
    remaining: u32,
}

impl HealthChecker {
    /// Start checking `info` on a new task.
    ///
    /// `reports` is shared by every checker; the registry side drains it.
    pub fn spawn(
        info: RegistrantInfo,
        client: Arc<dyn HeartbeatClient>,
        sink: Arc<dyn MetricsSink>,
        reports: mpsc::Sender<TerminationReport>,
        config: HealthCheckConfig,
    ) -> HealthCheckerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(CheckerState::Running);

        // The schedule starts now, not when the task is first polled.
        // tokio's interval panics on a zero period or an unrepresentable deadline.
        let period = config.interval.clamp(Duration::from_millis(1), MAX_DURATION);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let id = NEXT_CHECKER_ID.fetch_add(1, Ordering::Relaxed);
        let checker = HealthChecker {
            id,
            info: info.clone(),
            client,
            sink,
            reports,
            config,
            state: state_tx,
            remaining: config.max_heartbeat_retries.max(1),
        };

        let task = tokio::spawn(checker.run(ticker, stop_rx));

        HealthCheckerHandle {
            id,
            info,
            stop_tx,
            state_rx,
            task,
        }
    }

    async fn run(mut self, mut ticker: Interval, mut stop: watch::Receiver<bool>) {
        info!(
            service = %self.info.service_name,
            address = %self.info.control_address,
            interval = ?self.config.interval,
            budget = self.remaining,
            "starting health check"
        );

        let reason = loop {
            tokio::select! {
                biased;

                // Also fires if the handle was dropped.
                _ = stop.changed() => {
                    self.state.send_replace(CheckerState::Stopping);
                    debug!(service = %self.info.service_name, "health check stop requested");
                    break TerminationReason::Stopped;
                }
                _ = ticker.tick() => {
                    if self.cycle().await {
                        break TerminationReason::Unreachable;
                    }
                }
            }
        };

        self.terminate(ticker, reason).await;
    }

    /// One probe cycle. Returns true once the budget is exhausted.
    async fn cycle(&mut self) -> bool {
        trace!(service = %self.info.service_name, "sending heartbeat");
        match self.probe().await {
            Ok(points) => {
                if self.remaining < self.config.max_heartbeat_retries {
                    info!(service = %self.info.service_name, "heartbeat recovered");
                }
                self.remaining = self.config.max_heartbeat_retries.max(1);
                debug!(service = %self.info.service_name, points, "heartbeat ok");
                false
            }
            Err(e) => {
                self.remaining = self.remaining.saturating_sub(1);
                warn!(
                    service = %self.info.service_name,
                    address = %self.info.control_address,
                    remaining = self.remaining,
                    error = %e,
                    "heartbeat failed"
                );
                self.remaining == 0
            }
        }
    }

    /// Heartbeat through the retry policy, then forward stats to the sink.
    async fn probe(&self) -> Result<usize, ProbeError> {
        let request = HeartbeatRequest::default();
        let timeout = self.config.probe_timeout;
        let client = self.client.as_ref();

        let response = self
            .config
            .retry
            .run(|_attempt| async move {
                match tokio::time::timeout(timeout, client.heartbeat(&request)).await {
                    Ok(result) => result,
                    Err(_) => Err(HeartbeatError::Timeout(timeout)),
                }
            })
            .await?
            .ok_or(ProbeError::EmptyResponse)?;

        Ok(bridge::forward(self.sink.as_ref(), &response.stats).await)
    }

    async fn terminate(self, ticker: Interval, reason: TerminationReason) {
        drop(ticker);
        debug!(service = %self.info.service_name, "health check timer stopped");

        let report = TerminationReport {
            registrant: self.info.clone(),
            reason,
            checker_id: self.id,
        };
        if self.reports.send(report).await.is_err() {
            warn!(
                service = %self.info.service_name,
                ?reason,
                "termination report dropped, receiver is gone"
            );
        }

        self.state.send_replace(CheckerState::Terminated);
        info!(service = %self.info.service_name, ?reason, "health check stopped");
    }
}

/// Owner-side handle to a running checker.
///
/// Dropping the handle stops the checker the same way [`stop`](Self::stop) does.
pub struct HealthCheckerHandle {
    id: u64,
    info: RegistrantInfo,
    stop_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<CheckerState>,
    task: JoinHandle<()>,
}

impl HealthCheckerHandle {
    /// Process-unique id, echoed in this checker's [`TerminationReport`].
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn registrant(&self) -> &RegistrantInfo {
        &self.info
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CheckerState {
        *self.state_rx.borrow()
    }

    /// Whether the checker task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Request shutdown. A probe already in flight is allowed to finish.
    ///
    /// The returned handle resolves once the termination report is sent;
    /// it may be dropped without cancelling anything.
    pub fn stop(self) -> JoinHandle<()> {
        let _ = self.stop_tx.send(true);
        self.task
    }

    /// Wait for the checker to exit on its own.
    pub async fn join(self) {
        // Keep the stop sender alive so waiting does not count as a stop.
        let HealthCheckerHandle { stop_tx, task, .. } = self;
        let _ = task.await;
        drop(stop_tx);
    }
}
