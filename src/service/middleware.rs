//! Request metrics middleware.
//!
//! Emits one `request_metric` event per request on the
//! `siso_forum::metrics` target. Aggregation happens downstream from logs.

use std::sync::OnceLock;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use regex_lite::Regex;
use tracing::info;

/// Record method, normalized path, status and latency of each request.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    info!(
        target: "siso_forum::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request_metric"
    );

    response
}

/// Record the outcome of a vote request.
pub fn record_vote(kind: &str, accepted: bool) {
    let result = if accepted { "accepted" } else { "rejected" };
    info!(
        target: "siso_forum::metrics",
        metric_type = "vote",
        kind = kind,
        result = result,
        "vote_metric"
    );
}

/// Replace numeric path segments with `:id` to keep cardinality bounded.
fn normalize_path(path: &str) -> String {
    static ID_SEGMENT: OnceLock<Regex> = OnceLock::new();
    let re = ID_SEGMENT.get_or_init(|| Regex::new(r"/[0-9]+\b").expect("valid id pattern"));
    re.replace_all(path, "/:id").to_string()
}
