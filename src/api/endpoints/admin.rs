//! Admin accounts, dashboard and site content.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::crud;
use crate::api::endpoints::accounts::{self, LoginRequest};
use crate::api::endpoints::collections::CollectionInfo;
use crate::api::middleware;
use crate::api::router::RouteLoadError;
use crate::api::types::{created, ApiContext, ApiJson, ApiResponse, ApiResult, AuthContext, Created};
use crate::auth;
use crate::db::store::{self, DocumentFilter};
use crate::models::{Admin, AdminContent, AdminProfile, Booking, BookingStatus, Stored};

pub fn routes(_ctx: &ApiContext) -> Result<Router<ApiContext>, RouteLoadError> {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/register", post(register))
        .route("/dashboard", get(dashboard))
        .route_layer(axum::middleware::from_fn(middleware::auth::require_admin));

    Ok(Router::new()
        .route("/login", post(login))
        .merge(protected)
        .nest("/content", crud::routes::<AdminContent>()))
}

#[derive(Debug, Deserialize)]
pub struct RegisterAdmin {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub collections: Vec<CollectionInfo>,
    pub pending_bookings: u64,
    pub recent_bookings: Vec<Stored<Booking>>,
}

/// `POST /api/admin/login`
pub async fn login(
    State(ctx): State<ApiContext>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<AdminProfile> {
    let (admin, token) = accounts::login::<Admin>(&ctx, &request).await?;
    Ok(Json(
        ApiResponse::ok(AdminProfile::from(&admin)).with_token(token),
    ))
}

pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthContext>,
) -> ApiResult<Value> {
    accounts::logout(&ctx, &caller.token)?;
    Ok(Json(ApiResponse::ok(json!({})).with_message("Logged out")))
}

pub async fn me(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthContext>,
) -> ApiResult<AdminProfile> {
    let conn = ctx.core.open_db()?;
    let admin = store::get_by_id::<Admin>(&conn, &caller.subject_id)?;
    Ok(Json(ApiResponse::ok(AdminProfile::from(&admin))))
}

/// `POST /api/admin/register` — an existing admin creates another.
pub async fn register(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthContext>,
    ApiJson(request): ApiJson<RegisterAdmin>,
) -> Created<AdminProfile> {
    auth::check_password_strength(&request.password)?;
    accounts::ensure_email_free::<Admin>(&ctx, &request.email)?;

    let password_hash =
        accounts::hash_secret(&request.password, ctx.core.config.password_iterations).await?;
    let admin = accounts::insert_account(
        &ctx,
        Admin {
            name: request.name,
            email: request.email,
            password_hash,
        },
    )?;

    tracing::info!(admin_id = %admin.id, created_by = %caller.subject_id, "Admin registered");
    Ok(created(
        ApiResponse::ok(AdminProfile::from(&admin)).with_message("Admin created successfully"),
    ))
}

/// `GET /api/admin/dashboard`
pub async fn dashboard(State(ctx): State<ApiContext>) -> ApiResult<Dashboard> {
    let conn = ctx.core.open_db()?;
    let collections = store::collection_counts(&conn)?
        .into_iter()
        .map(|(name, count)| CollectionInfo { name, count })
        .collect();

    let pending = DocumentFilter::new()
        .text("status", Some(BookingStatus::Pending.as_str().to_string()))
        .paginate(None, Some(5));
    let page = store::list::<Booking>(&conn, &pending)?;

    Ok(Json(ApiResponse::ok(Dashboard {
        collections,
        pending_bookings: page.total,
        recent_bookings: page.items,
    })))
}
