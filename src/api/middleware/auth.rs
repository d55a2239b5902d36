//! Bearer token authentication middleware.
//!
//! `identify` runs on every API request: when an `Authorization: Bearer`
//! header is present it resolves the token and injects either
//! `AuthContext` or a `TokenProblem` into request extensions. The
//! `require_*` layers then gate individual routes on that outcome, so
//! public routes still see who is calling.

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthContext, TokenProblem};
use crate::auth::{self, AuthError};
use crate::db::sessions::Role;

/// Role of the caller, copied into response extensions for the request log.
#[derive(Debug, Clone, Copy)]
pub struct CallerRole(pub Option<Role>);

pub async fn identify(req: Request<axum::body::Body>, next: Next) -> Response {
    match identify_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn identify_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(&req) else {
        return Ok(next.run(req).await);
    };

    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let resolved = {
        let conn = ctx.core.open_db()?;
        auth::resolve_token(&conn, &token)
    };

    let role = match resolved {
        Ok(session) => {
            let role = session.role;
            req.extensions_mut().insert(AuthContext {
                subject_id: session.subject_id,
                role,
                token,
            });
            Some(role)
        }
        Err(AuthError::TokenExpired) => {
            req.extensions_mut().insert(TokenProblem::Expired);
            None
        }
        Err(AuthError::InvalidToken) => {
            req.extensions_mut().insert(TokenProblem::Invalid);
            None
        }
        Err(other) => return Err(other.into()),
    };

    let mut response = next.run(req).await;
    response.extensions_mut().insert(CallerRole(role));
    if role.is_some() {
        response
            .headers_mut()
            .insert("Cache-Control", HeaderValue::from_static("no-store"));
    }
    Ok(response)
}

/// Require an admin token.
pub async fn require_admin(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_role(&req, Role::Admin) {
        Ok(()) => next.run(req).await,
        Err(err) => err.into_response(),
    }
}

/// Require a patient token.
pub async fn require_patient(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_role(&req, Role::Patient) {
        Ok(()) => next.run(req).await,
        Err(err) => err.into_response(),
    }
}

fn require_role(req: &Request<axum::body::Body>, role: Role) -> Result<(), ApiError> {
    if let Some(caller) = req.extensions().get::<AuthContext>() {
        if caller.role == role {
            return Ok(());
        }
        return Err(ApiError::Forbidden(match role {
            Role::Admin => "Admin access required".into(),
            Role::Patient => "Patient access required".into(),
        }));
    }
    match req.extensions().get::<TokenProblem>() {
        Some(TokenProblem::Expired) => Err(ApiError::TokenExpired),
        _ => Err(ApiError::Unauthorized),
    }
}

fn bearer_token(req: &Request<axum::body::Body>) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
