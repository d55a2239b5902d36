//! Database availability guard.
//!
//! When the database is marked disconnected, one reconnect (with the
//! configured retry policy) is attempted before the request proceeds.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

pub async fn guard(req: Request<axum::body::Body>, next: Next) -> Response {
    let Some(ctx) = req.extensions().get::<ApiContext>().cloned() else {
        return ApiError::Internal("missing API context".into()).into_response();
    };

    if !ctx.core.is_connected() {
        tracing::warn!("Database disconnected, reconnecting before request");
        if let Err(e) = ctx.core.connect().await {
            tracing::error!(error = %e, "Database reconnect failed");
            return ApiError::DatabaseUnavailable.into_response();
        }
    }

    next.run(req).await
}
