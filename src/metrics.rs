use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder. Call once, from `main`.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe();
        Ok(Self { handle })
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("recommend_requests_total", "Recommendation requests received.");
    describe_counter!(
        "recommend_rule_total",
        "Recommendations by the cascade rule that chose the candidate list."
    );
    describe_counter!(
        "venue_search_stage_total",
        "Venue searches by fallback stage (initial, range_expansion, keyword_fallback)."
    );
    describe_counter!(
        "provider_errors_total",
        "Weather/venue provider failures recovered by the pipeline."
    );
    describe_counter!("request_log_errors_total", "Request log writes that failed.");
    describe_histogram!(
        "recommend_latency_ms",
        "End-to-end recommendation time in milliseconds."
    );
}
