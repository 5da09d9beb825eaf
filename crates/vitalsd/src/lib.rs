//! vitalsd — the Vitals daemon.
//!
//! Assembles the metrics aggregator and the health monitor, admits the
//! registrants listed in `vitals.toml`, and serves a small HTTP API.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/healthz` | Liveness of the daemon itself |
//! | GET | `/metrics` | Prometheus exposition of the latest samples |
//! | GET | `/api/v1/registrants` | List monitored registrants |
//! | POST | `/api/v1/registrants` | Register a service for health checking |
//! | DELETE | `/api/v1/registrants/{name}` | Deregister a service |

pub mod handlers;
pub mod reaper;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get};
use vitals_health::HealthMonitor;
use vitals_metrics::MetricsAggregator;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub aggregator: MetricsAggregator,
    pub monitor: Arc<HealthMonitor>,
}

/// Build the complete API router.
pub fn build_router(aggregator: MetricsAggregator, monitor: Arc<HealthMonitor>) -> Router {
    let state = ApiState {
        aggregator,
        monitor,
    };

    let api_routes = Router::new()
        .route(
            "/registrants",
            get(handlers::list_registrants).post(handlers::register),
        )
        .route("/registrants/{name}", delete(handlers::deregister));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::prometheus_metrics))
        .with_state(state)
}
