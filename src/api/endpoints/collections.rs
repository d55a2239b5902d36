use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;

use crate::api::error::ApiError;
use crate::api::middleware;
use crate::api::router::RouteLoadError;
use crate::api::types::{ApiContext, ApiResponse, ApiResult};
use crate::db::store;
use crate::models::COLLECTIONS;

pub fn routes(_ctx: &ApiContext) -> Result<Router<ApiContext>, RouteLoadError> {
    let admin = Router::new()
        .route("/:name", get(documents))
        .route_layer(axum::middleware::from_fn(middleware::auth::require_admin));
    Ok(Router::new().route("/", get(list)).merge(admin))
}

#[derive(Debug, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub count: u64,
}

/// `GET /api/collections`
pub async fn list(State(ctx): State<ApiContext>) -> ApiResult<Vec<CollectionInfo>> {
    let conn = ctx.core.open_db()?;
    let collections: Vec<CollectionInfo> = store::collection_counts(&conn)?
        .into_iter()
        .map(|(name, count)| CollectionInfo { name, count })
        .collect();
    let count = collections.len();
    Ok(Json(ApiResponse::ok(collections).with_count(count)))
}

/// `GET /api/collections/:name` — raw documents, password hashes stripped.
pub async fn documents(
    State(ctx): State<ApiContext>,
    Path(name): Path<String>,
) -> ApiResult<Vec<Value>> {
    if !COLLECTIONS.contains(&name.as_str()) {
        return Err(ApiError::NotFound(format!("Collection '{name}' not found")));
    }
    let conn = ctx.core.open_db()?;
    let docs = store::list_raw(&conn, &name)?;
    let count = docs.len();
    Ok(Json(ApiResponse::ok(docs).with_count(count)))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{TestApp, ADMIN_EMAIL};
    use crate::models::Faq;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn counts_every_collection() {
        let app = TestApp::new().await;
        app.seed(Faq {
            question: "Visa?".into(),
            answer: "Yes".into(),
            ..Default::default()
        });

        let response = app.get("/api/collections", None).await;
        assert_eq!(response.status, StatusCode::OK);
        let data = response.json["data"].as_array().unwrap();
        let faqs = data.iter().find(|c| c["name"] == "faqs").unwrap();
        assert_eq!(faqs["count"], 1);
        let admins = data.iter().find(|c| c["name"] == "admins").unwrap();
        assert_eq!(admins["count"], 1);
        assert!(data.iter().any(|c| c["name"] == "bookings" && c["count"] == 0));
    }

    #[tokio::test]
    async fn raw_documents_hide_password_hashes() {
        let app = TestApp::new().await;
        let response = app.get("/api/collections/admins", None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);

        let response = app
            .get("/api/collections/admins", Some(&app.admin_token))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["data"][0]["email"], ADMIN_EMAIL);
        assert!(response.json["data"][0].get("passwordHash").is_none());
        assert!(!response.json.to_string().contains("pbkdf2"));
    }

    #[tokio::test]
    async fn unknown_collection_is_404() {
        let app = TestApp::new().await;
        let response = app
            .get("/api/collections/sessions", Some(&app.admin_token))
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}
