//! Per-request metrics.
//!
//! Labels use the matched route template (`/categories/{id}`), never the raw
//! path, so label cardinality stays bounded.

use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::observability::metrics;

pub async fn track_requests(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(req).await;
    metrics::record_request(&method, &route, response.status().as_u16(), start);
    response
}
