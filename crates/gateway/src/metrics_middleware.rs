//! HTTP request metrics middleware.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};

use smsrelay_metrics::{counter, histogram, http as http_metrics, labels};

/// Records `smsrelay_http_requests_total` and the request duration histogram.
///
/// The route label is the matched route template (`/alert/{*rest}`), never
/// the raw path, so arbitrary suffixes cannot blow up label cardinality.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string());

    let response = next.run(request).await;
    let status = response.status().as_u16().to_string();

    counter!(
        http_metrics::REQUESTS_TOTAL,
        labels::ROUTE => route.clone(),
        labels::STATUS => status
    )
    .increment(1);
    histogram!(http_metrics::REQUEST_DURATION_SECONDS, labels::ROUTE => route)
        .record(start.elapsed().as_secs_f64());

    response
}
