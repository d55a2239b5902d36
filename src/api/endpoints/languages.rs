//! Site languages and the single default language.
//!
//! At most one language carries `isDefault`. Setting the flag on one
//! language clears it everywhere else in the same transaction, and the
//! first language ever created becomes the default.

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use rusqlite::Connection;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::middleware;
use crate::api::router::RouteLoadError;
use crate::api::types::{created, ApiContext, ApiJson, ApiResponse, ApiResult, Created};
use crate::db::store::{self, DocumentFilter};
use crate::models::{Document, Language, Stored};

pub fn routes(_ctx: &ApiContext) -> Result<Router<ApiContext>, RouteLoadError> {
    let public = Router::new()
        .route("/", get(list))
        .route("/default", get(default_language))
        .route("/:id", get(get_one));

    let admin = Router::new()
        .route("/", post(create))
        .route("/:id", axum::routing::put(update).delete(remove))
        .route("/:id/default", patch(make_default))
        .route_layer(axum::middleware::from_fn(middleware::auth::require_admin));

    Ok(public.merge(admin))
}

fn all_languages(conn: &Connection) -> Result<Vec<Stored<Language>>, ApiError> {
    let mut languages = store::list_all::<Language>(conn, &DocumentFilter::new().oldest_first())?;
    languages.sort_by(|a, b| {
        b.body
            .is_default
            .cmp(&a.body.is_default)
            .then_with(|| a.body.name.to_lowercase().cmp(&b.body.name.to_lowercase()))
    });
    Ok(languages)
}

fn current_default(conn: &Connection) -> Result<Option<Stored<Language>>, ApiError> {
    let filter = DocumentFilter::new().flag("isDefault", true).oldest_first();
    Ok(store::list_all::<Language>(conn, &filter)?.into_iter().next())
}

/// Clear `isDefault` on every language except `keep`.
fn clear_other_defaults(conn: &Connection, keep: &str) -> Result<(), ApiError> {
    let filter = DocumentFilter::new().flag("isDefault", true);
    for other in store::list_all::<Language>(conn, &filter)? {
        if other.id != keep {
            let mut body = other.body;
            body.is_default = false;
            store::replace(conn, &other.id, body)?;
        }
    }
    Ok(())
}

fn check_unique_code(conn: &Connection, code: &str, id: Option<&str>) -> Result<(), ApiError> {
    let existing = store::find_one_by_field::<Language>(conn, "shortCode", code)?;
    if existing.is_some_and(|lang| Some(lang.id.as_str()) != id) {
        return Err(ApiError::Conflict(format!(
            "Language with code '{code}' already exists"
        )));
    }
    Ok(())
}

/// `GET /api/language` — default first, then by name.
pub async fn list(State(ctx): State<ApiContext>) -> ApiResult<Vec<Stored<Language>>> {
    let conn = ctx.core.open_db()?;
    let languages = all_languages(&conn)?;
    let count = languages.len();
    Ok(Json(ApiResponse::ok(languages).with_count(count)))
}

pub async fn default_language(State(ctx): State<ApiContext>) -> ApiResult<Stored<Language>> {
    let conn = ctx.core.open_db()?;
    let language = current_default(&conn)?
        .ok_or_else(|| ApiError::NotFound("No default language set".into()))?;
    Ok(Json(ApiResponse::ok(language)))
}

pub async fn get_one(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> ApiResult<Stored<Language>> {
    let conn = ctx.core.open_db()?;
    let language = store::find_by_id::<Language>(&conn, &id)?
        .ok_or_else(|| ApiError::not_found(Language::ENTITY))?;
    Ok(Json(ApiResponse::ok(language)))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    ApiJson(mut language): ApiJson<Language>,
) -> Created<Stored<Language>> {
    language.normalize();
    language.validate()?;

    let conn = ctx.core.open_db()?;
    let tx = conn.unchecked_transaction()?;
    check_unique_code(&tx, &language.short_code, None)?;
    if store::count::<Language>(&tx, &DocumentFilter::new())? == 0 {
        language.is_default = true;
    }
    let stored = store::insert(&tx, language)?;
    if stored.body.is_default {
        clear_other_defaults(&tx, &stored.id)?;
    }
    tx.commit()?;

    tracing::info!(code = %stored.body.short_code, default = stored.body.is_default, "Language created");
    Ok(created(
        ApiResponse::ok(stored).with_message("Language created successfully"),
    ))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<Value>,
) -> ApiResult<Stored<Language>> {
    let conn = ctx.core.open_db()?;
    let tx = conn.unchecked_transaction()?;

    let was_default = store::get_by_id::<Language>(&tx, &id)?.body.is_default;
    let language = store::merged::<Language>(&tx, &id, &patch)?;
    language.validate()?;
    check_unique_code(&tx, &language.short_code, Some(&id))?;
    if was_default && !language.is_default {
        return Err(ApiError::BadRequest(
            "Set another language as default first".into(),
        ));
    }

    let stored = store::replace(&tx, &id, language)?;
    if stored.body.is_default {
        clear_other_defaults(&tx, &id)?;
    }
    tx.commit()?;

    Ok(Json(
        ApiResponse::ok(stored).with_message("Language updated successfully"),
    ))
}

/// `PATCH /api/language/:id/default`
pub async fn make_default(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> ApiResult<Stored<Language>> {
    let conn = ctx.core.open_db()?;
    let tx = conn.unchecked_transaction()?;

    let mut language = store::get_by_id::<Language>(&tx, &id)?.body;
    language.is_default = true;
    let stored = store::replace(&tx, &id, language)?;
    clear_other_defaults(&tx, &id)?;
    tx.commit()?;

    tracing::info!(code = %stored.body.short_code, "Default language changed");
    Ok(Json(
        ApiResponse::ok(stored).with_message("Default language updated"),
    ))
}

pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let conn = ctx.core.open_db()?;
    let language = store::get_by_id::<Language>(&conn, &id)?;
    if language.body.is_default && store::count::<Language>(&conn, &DocumentFilter::new())? > 1 {
        return Err(ApiError::BadRequest(
            "Cannot delete the default language while other languages exist".into(),
        ));
    }

    store::delete::<Language>(&conn, &id)?;
    Ok(Json(
        ApiResponse::ok(json!({ "_id": id })).with_message("Language deleted successfully"),
    ))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{TestApp, TestResponse};
    use axum::http::StatusCode;
    use serde_json::json;

    async fn add(app: &TestApp, name: &str, code: &str, default: bool) -> TestResponse {
        app.post(
            "/api/language",
            Some(&app.admin_token),
            &json!({ "name": name, "shortCode": code, "isDefault": default }),
        )
        .await
    }

    fn id_of(response: &TestResponse) -> String {
        response.json["data"]["_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn first_language_becomes_default() {
        let app = TestApp::new().await;
        let response = app.get("/api/language/default", None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);

        let response = add(&app, "English", "en", false).await;
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.json["data"]["shortCode"], "EN");
        assert_eq!(response.json["data"]["isDefault"], true);

        let response = add(&app, "Arabic", "AR", false).await;
        assert_eq!(response.json["data"]["isDefault"], false);

        let response = app.get("/api/language/default", None).await;
        assert_eq!(response.json["data"]["shortCode"], "EN");
    }

    #[tokio::test]
    async fn duplicate_code_conflicts() {
        let app = TestApp::new().await;
        add(&app, "English", "EN", false).await;
        let response = add(&app, "English (UK)", "en", false).await;
        assert_eq!(response.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn only_one_default() {
        let app = TestApp::new().await;
        add(&app, "English", "EN", false).await;
        let turkish = add(&app, "Turkish", "TR", true).await;
        add(&app, "Arabic", "AR", false).await;

        let response = app.get("/api/language", None).await;
        let data = response.json["data"].as_array().unwrap();
        let defaults: Vec<_> = data.iter().filter(|l| l["isDefault"] == true).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(data[0]["shortCode"], "TR");
        assert_eq!(data[1]["name"], "Arabic");
        assert_eq!(data[2]["name"], "English");

        let arabic = data[1]["_id"].as_str().unwrap().to_string();
        let response = app
            .send(
                "PATCH",
                &format!("/api/language/{arabic}/default"),
                Some(&app.admin_token),
                &json!({}),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);

        let response = app.get("/api/language/default", None).await;
        assert_eq!(response.json["data"]["shortCode"], "AR");
        let response = app
            .get(&format!("/api/language/{}", id_of(&turkish)), None)
            .await;
        assert_eq!(response.json["data"]["isDefault"], false);
    }

    #[tokio::test]
    async fn default_cannot_be_deleted_while_others_exist() {
        let app = TestApp::new().await;
        let english = id_of(&add(&app, "English", "EN", false).await);
        let arabic = id_of(&add(&app, "Arabic", "AR", false).await);

        let uri = format!("/api/language/{english}");
        let response = app.send("DELETE", &uri, Some(&app.admin_token), &json!({})).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);

        let response = app
            .send("DELETE", &format!("/api/language/{arabic}"), Some(&app.admin_token), &json!({}))
            .await;
        assert_eq!(response.status, StatusCode::OK);

        let response = app.send("DELETE", &uri, Some(&app.admin_token), &json!({})).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["data"]["_id"], english);
    }

    #[tokio::test]
    async fn update_moves_default_flag() {
        let app = TestApp::new().await;
        let english = id_of(&add(&app, "English", "EN", false).await);
        let arabic = id_of(&add(&app, "Arabic", "AR", false).await);

        let response = app
            .send(
                "PUT",
                &format!("/api/language/{arabic}"),
                Some(&app.admin_token),
                &json!({ "isDefault": true }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);

        let response = app.get(&format!("/api/language/{english}"), None).await;
        assert_eq!(response.json["data"]["isDefault"], false);

        let response = app
            .send(
                "PUT",
                &format!("/api/language/{arabic}"),
                Some(&app.admin_token),
                &json!({ "isDefault": false }),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn writes_require_admin() {
        let app = TestApp::new().await;
        let response = app
            .post("/api/language", None, &json!({ "name": "English", "shortCode": "EN" }))
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }
}
