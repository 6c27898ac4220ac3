//! Prometheus metrics for Dirlink
//!
//! Exposes metrics at `/metrics` endpoint in Prometheus format.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dirlink_core::types::{ReconcileAction, Verdict};
use dirlink_core::{Error, Result};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Metric names
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "dirlink_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "dirlink_http_request_duration_seconds";

    // Login metrics
    pub const LOGIN_ATTEMPTS_TOTAL: &str = "dirlink_login_attempts_total";
    pub const LOGIN_DURATION_SECONDS: &str = "dirlink_login_duration_seconds";
    pub const USERS_RECONCILED_TOTAL: &str = "dirlink_users_reconciled_total";

    // System metrics
    pub const UPTIME_SECONDS: &str = "dirlink_uptime_seconds";
    pub const INFO: &str = "dirlink_info";
}

/// Metrics recorder
#[derive(Clone)]
pub struct MetricsRecorder {
    handle: PrometheusHandle,
    start_time: Instant,
}

impl MetricsRecorder {
    /// Install the Prometheus recorder as the process-wide recorder
    pub fn install() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| Error::Internal(format!("Failed to install Prometheus recorder: {}", e)))?;

        gauge!(names::INFO, "version" => dirlink_core::VERSION).set(1.0);

        Ok(Self {
            handle,
            start_time: Instant::now(),
        })
    }

    /// A recorder that renders but is not installed globally. Metric macros
    /// called elsewhere do not reach it.
    pub fn detached() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        Self {
            handle: recorder.handle(),
            start_time: Instant::now(),
        }
    }

    /// Get metrics output in Prometheus format
    pub fn render(&self) -> String {
        gauge!(names::UPTIME_SECONDS).set(self.start_time.elapsed().as_secs_f64());

        self.handle.render()
    }

    /// Record an HTTP request
    pub fn record_http_request(&self, method: &str, status: u16, duration_secs: f64) {
        let status_class = format!("{}xx", status / 100);

        counter!(
            names::HTTP_REQUESTS_TOTAL,
            "method" => method.to_string(),
            "status" => status.to_string(),
            "status_class" => status_class
        )
        .increment(1);

        histogram!(
            names::HTTP_REQUEST_DURATION_SECONDS,
            "method" => method.to_string()
        )
        .record(duration_secs);
    }

    /// Record a finished login attempt
    pub fn record_login(&self, method: &'static str, verdict: &Verdict, duration_secs: f64) {
        counter!(
            names::LOGIN_ATTEMPTS_TOTAL,
            "method" => method,
            "outcome" => verdict.outcome_label()
        )
        .increment(1);

        histogram!(names::LOGIN_DURATION_SECONDS, "method" => method).record(duration_secs);

        if let Verdict::Success { action, .. } = verdict {
            self.record_reconcile(*action);
        }
    }

    /// Record what reconciliation did to the user store
    pub fn record_reconcile(&self, action: ReconcileAction) {
        counter!(names::USERS_RECONCILED_TOTAL, "action" => action.as_str()).increment(1);
    }
}

/// Axum middleware for recording HTTP metrics
pub async fn metrics_middleware(
    State(metrics): State<Arc<MetricsRecorder>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16();

    metrics.record_http_request(&method, status, duration);

    debug!(
        method = %method,
        path = %path,
        status = %status,
        duration_ms = %(duration * 1000.0),
        "Request completed"
    );

    response
}

/// Handler for /metrics endpoint
pub async fn metrics_handler(State(metrics): State<Arc<MetricsRecorder>>) -> impl IntoResponse {
    let output = metrics.render();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        output,
    )
}
