//! Shared types for the HTTP API layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::auth::LoginThrottle;
use crate::core_state::CoreState;
use crate::db::sessions::Role;
use crate::db::store::Page;
use crate::models::Stored;

/// Page size for `GET /` listings when `limit` is absent.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

// ═══════════════════════════════════════════════════════════
// API context — shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
/// Wraps `CoreState` plus API-specific in-memory state.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub login_throttle: Arc<Mutex<LoginThrottle>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self {
            core,
            login_throttle: Arc::new(Mutex::new(LoginThrottle::new())),
        }
    }

    /// `Err(ApiError::RateLimited)` while `key` is locked out.
    pub fn check_login(&self, key: &str) -> Result<(), ApiError> {
        let mut throttle = self
            .login_throttle
            .lock()
            .map_err(|_| ApiError::Internal("login throttle lock".into()))?;
        throttle
            .check(key)
            .map_err(|retry_after| ApiError::RateLimited { retry_after })
    }

    pub fn record_login(&self, key: &str, success: bool) {
        if let Ok(mut throttle) = self.login_throttle.lock() {
            if success {
                throttle.clear(key);
            } else {
                throttle.record_failure(key);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Caller identity — injected by the identify middleware
// ═══════════════════════════════════════════════════════════

/// Authenticated caller, present in request extensions when a valid
/// bearer token was supplied.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub subject_id: String,
    pub role: Role,
    /// Raw token of this request, kept for logout.
    pub token: String,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Why a supplied bearer token was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenProblem {
    Invalid,
    Expired,
}

/// True when the optional caller holds an admin token.
pub fn is_admin(caller: &Option<axum::Extension<AuthContext>>) -> bool {
    caller.as_ref().is_some_and(|c| c.is_admin())
}

// ═══════════════════════════════════════════════════════════
// Response envelope
// ═══════════════════════════════════════════════════════════

/// `{ "success": true, "data": .., ... }` with optional listing metadata.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            count: None,
            total: None,
            page: None,
            pages: None,
            token: None,
            message: None,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Serialize> ApiResponse<Vec<Stored<T>>> {
    pub fn page(page: Page<T>) -> Self {
        let count = page.items.len();
        Self {
            count: Some(count),
            total: Some(page.total),
            page: Some(page.page),
            pages: Some(page.pages),
            ..Self::ok(page.items)
        }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;
pub type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

pub fn created<T: Serialize>(response: ApiResponse<T>) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(response))
}

// ═══════════════════════════════════════════════════════════
// Request helpers
// ═══════════════════════════════════════════════════════════

/// JSON body extractor whose rejections use the API error envelope.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// Raw query string parameters of a listing request.
pub type QueryParams = HashMap<String, String>;

/// A numeric query parameter; absent or unparsable values are `None`.
pub fn query_number(params: &QueryParams, key: &str) -> Option<u32> {
    params.get(key).and_then(|v| v.trim().parse().ok())
}

pub fn query_text(params: &QueryParams, key: &str) -> Option<String> {
    params
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::Page;
    use crate::models::Faq;
    use chrono::Utc;

    #[test]
    fn envelope_omits_absent_metadata() {
        let json = serde_json::to_value(ApiResponse::ok("x")).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "data": "x" }));
    }

    #[test]
    fn page_envelope_carries_totals() {
        let page = Page {
            items: vec![Stored {
                id: "1".into(),
                body: Faq::default(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }],
            total: 7,
            page: 2,
            pages: 4,
        };
        let json = serde_json::to_value(ApiResponse::page(page)).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["total"], 7);
        assert_eq!(json["page"], 2);
        assert_eq!(json["pages"], 4);
        assert_eq!(json["data"][0]["_id"], "1");
    }

    #[test]
    fn query_numbers_ignore_garbage() {
        let params: QueryParams = [("page", "-1"), ("limit", " 5 ")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(query_number(&params, "page"), None);
        assert_eq!(query_number(&params, "limit"), Some(5));
        assert_eq!(query_number(&params, "missing"), None);
    }

    #[test]
    fn throttle_through_context() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ApiContext::new(Arc::new(CoreState::new(
            crate::config::Config::for_tests(dir.path()),
        )));
        for _ in 0..5 {
            assert!(ctx.check_login("a@b.com").is_ok());
            ctx.record_login("a@b.com", false);
        }
        assert!(matches!(
            ctx.check_login("a@b.com"),
            Err(ApiError::RateLimited { .. })
        ));
    }
}
