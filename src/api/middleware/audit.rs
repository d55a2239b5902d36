//! Request logging middleware.
//!
//! Logs every API request with method, path, status, caller role and
//! elapsed time. Runs outermost so rejected requests are logged too.

use std::time::Instant;

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::middleware::auth::CallerRole;

pub async fn log_request(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let caller = response
        .extensions()
        .get::<CallerRole>()
        .and_then(|c| c.0)
        .map(|role| role.as_str())
        .unwrap_or("anonymous");
    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if response.status().is_server_error() {
        tracing::warn!(%method, %path, status, caller, elapsed_ms, "API request failed");
    } else {
        tracing::info!(%method, %path, status, caller, elapsed_ms, "API request");
    }

    response
}
