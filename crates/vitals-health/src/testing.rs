//! Scripted heartbeat client and recording sink for checker tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use vitals_core::{DataPoint, HeartbeatRequest, HeartbeatResponse, Stats};
use vitals_metrics::MetricsSink;

use crate::client::HeartbeatClient;
use crate::error::HeartbeatError;

/// What the scripted client does on one call.
#[derive(Debug, Clone)]
pub enum Step {
    Respond(Vec<Stats>),
    /// Succeed without a payload.
    Empty,
    Fail,
    /// Succeed with no stats after a delay.
    Delay(Duration),
    /// Never resolve.
    Hang,
}

/// Plays back one [`Step`] per call, then answers with empty successes.
pub struct ScriptedClient {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    completed: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HeartbeatClient for ScriptedClient {
    async fn heartbeat(
        &self,
        _request: &HeartbeatRequest,
    ) -> Result<Option<HeartbeatResponse>, HeartbeatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Respond(Vec::new()));

        let result = match step {
            Step::Respond(stats) => Ok(Some(HeartbeatResponse { stats })),
            Step::Empty => Ok(None),
            Step::Fail => Err(HeartbeatError::Status(503)),
            Step::Delay(d) => {
                tokio::time::sleep(d).await;
                Ok(Some(HeartbeatResponse::default()))
            }
            Step::Hang => std::future::pending().await,
        };
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}

/// Sink that keeps every data point in arrival order.
#[derive(Default)]
pub struct RecordingSink {
    points: Mutex<Vec<DataPoint>>,
}

impl RecordingSink {
    pub fn points(&self) -> Vec<DataPoint> {
        self.points.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricsSink for RecordingSink {
    async fn add_data_point(&self, point: DataPoint) {
        self.points.lock().unwrap().push(point);
    }
}

pub fn stats(service_id: &str, ts: i64) -> Stats {
    Stats {
        service_id: service_id.to_string(),
        ts,
        cpu: 0.5,
        memory: 0.2,
        threads: 4,
        concurrency_units: 10,
    }
}
