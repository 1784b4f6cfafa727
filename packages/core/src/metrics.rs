//! Prometheus metrics registry for the ClickCrate Actions service.
//!
//! [`AppMetrics`] owns every registered metric and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and hand it to
//! the router state; [`track_metrics`] records HTTP traffic and the
//! handlers record the creator-flow counters.
//!
//! Exposed at `GET /metrics` in Prometheus text exposition format
//! (`text/plain; version=0.0.4`).

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use prometheus::{
    Counter, CounterVec, Gauge, Histogram, HistogramOpts, Opts, Registry,
};

/// All application-level Prometheus metrics.
pub struct AppMetrics {
    /// HTTP request count, labelled by method, path, and status code.
    pub http_requests_total: CounterVec,
    /// HTTP request latency histogram in seconds.
    pub http_request_duration: Histogram,
    /// Verification emails handed to the email provider.
    pub verification_emails_sent_total: Counter,
    /// Verification attempts rejected (unknown id, wrong account or code).
    pub verification_failures_total: Counter,
    /// Products fully minted, registered and placed.
    pub products_created_total: Counter,
    /// Submissions currently waiting for their verification code.
    pub pending_submissions: Gauge,
    /// Failed calls to external collaborators, labelled by service.
    pub upstream_errors_total: CounterVec,
    pub registry: Registry,
}

impl AppMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new(
                "clickcrate_actions_http_requests_total",
                "HTTP requests by method, path, and status",
            ),
            &["method", "path", "status"],
        )?;

        let http_request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "clickcrate_actions_http_request_duration_seconds",
                "HTTP request latency in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;

        let verification_emails_sent_total = Counter::with_opts(Opts::new(
            "clickcrate_actions_verification_emails_sent_total",
            "Verification emails sent to product creators",
        ))?;

        let verification_failures_total = Counter::with_opts(Opts::new(
            "clickcrate_actions_verification_failures_total",
            "Rejected verification attempts",
        ))?;

        let products_created_total = Counter::with_opts(Opts::new(
            "clickcrate_actions_products_created_total",
            "Products minted and placed for sale",
        ))?;

        let pending_submissions = Gauge::with_opts(Opts::new(
            "clickcrate_actions_pending_submissions",
            "Product submissions awaiting verification",
        ))?;

        let upstream_errors_total = CounterVec::new(
            Opts::new(
                "clickcrate_actions_upstream_errors_total",
                "Failed calls to external services",
            ),
            &["service"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(verification_emails_sent_total.clone()))?;
        registry.register(Box::new(verification_failures_total.clone()))?;
        registry.register(Box::new(products_created_total.clone()))?;
        registry.register(Box::new(pending_submissions.clone()))?;
        registry.register(Box::new(upstream_errors_total.clone()))?;

        Ok(Self {
            http_requests_total,
            http_request_duration,
            verification_emails_sent_total,
            verification_failures_total,
            products_created_total,
            pending_submissions,
            upstream_errors_total,
            registry,
        })
    }

    pub fn record_upstream_error(&self, service: &str) {
        self.upstream_errors_total.with_label_values(&[service]).inc();
    }

    /// Render all metrics as Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}

/// Axum middleware recording request count and latency.
///
/// Uses the matched route template as the `path` label so ids in the URL
/// do not explode label cardinality.
pub async fn track_metrics(
    State(metrics): State<Arc<AppMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let started = Instant::now();
    let response = next.run(request).await;

    metrics
        .http_request_duration
        .observe(started.elapsed().as_secs_f64());
    metrics
        .http_requests_total
        .with_label_values(&[method.as_str(), path.as_str(), response.status().as_str()])
        .inc();

    response
}
