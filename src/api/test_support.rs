//! Router harness for endpoint tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use crate::api::router::api_router;
use crate::api::types::ApiContext;
use crate::auth;
use crate::config::Config;
use crate::core_state::CoreState;
use crate::db::sessions::Role;
use crate::db::store;
use crate::models::{Admin, Document, Patient, Stored};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json: Value,
}

pub struct TestApp {
    pub ctx: ApiContext,
    pub router: Router,
    pub admin_token: String,
    pub admin_id: String,
    pub dir: tempfile::TempDir,
}

impl TestApp {
    /// Connected app in a scratch directory with one admin account.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_tests(dir.path());
        adjust(&mut config);

        let core = Arc::new(CoreState::new(config));
        core.connect().await.unwrap();
        let ctx = ApiContext::new(core);

        let conn = ctx.core.open_db().unwrap();
        let admin = store::insert(
            &conn,
            Admin {
                name: "Admin".into(),
                email: ADMIN_EMAIL.into(),
                password_hash: auth::hash_password(
                    ADMIN_PASSWORD,
                    ctx.core.config.password_iterations,
                ),
            },
        )
        .unwrap();
        let admin_token = auth::issue_token(&conn, &admin.id, Role::Admin, 1).unwrap();
        drop(conn);

        let router = api_router(ctx.clone());
        Self {
            ctx,
            router,
            admin_token,
            admin_id: admin.id,
            dir,
        }
    }

    /// Insert a document directly, bypassing HTTP.
    pub fn seed<T: Document>(&self, doc: T) -> Stored<T> {
        let conn = self.ctx.core.open_db().unwrap();
        store::insert(&conn, doc).unwrap()
    }

    /// Create a patient with password "patient-password" and return a token.
    pub async fn patient_token(&self, email: &str) -> String {
        let conn = self.ctx.core.open_db().unwrap();
        let patient = store::insert(
            &conn,
            Patient {
                name: "Test Patient".into(),
                email: email.into(),
                password_hash: auth::hash_password(
                    "patient-password",
                    self.ctx.core.config.password_iterations,
                ),
                ..Default::default()
            },
        )
        .unwrap();
        auth::issue_token(&conn, &patient.id, Role::Patient, 1).unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request("GET", uri, token, Body::empty(), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: &Value) -> TestResponse {
        self.send("POST", uri, token, body).await
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: &Value,
    ) -> TestResponse {
        self.request(
            method,
            uri,
            token,
            Body::from(body.to_string()),
            Some("application/json"),
        )
        .await
    }

    pub async fn send_raw(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: &str,
    ) -> TestResponse {
        self.request(
            method,
            uri,
            token,
            Body::from(body.to_string()),
            Some("application/json"),
        )
        .await
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Body,
        content_type: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        if let Some(ct) = content_type {
            builder = builder.header("Content-Type", ct);
        }

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            json,
        }
    }
}
