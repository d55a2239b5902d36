//! Patient accounts: registration, login, self-service profile and the
//! admin view of all patients.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::endpoints::accounts::{self, LoginRequest, PasswordChange};
use crate::api::error::ApiError;
use crate::api::middleware;
use crate::api::router::RouteLoadError;
use crate::api::types::{
    created, query_number, ApiContext, ApiJson, ApiResponse, ApiResult, AuthContext, Created,
    QueryParams, DEFAULT_PAGE_SIZE,
};
use crate::auth;
use crate::db::sessions::{self, Role};
use crate::db::store::{self, DocumentFilter};
use crate::models::{Booking, Document, Patient, PatientProfile, Stored};

pub fn routes(_ctx: &ApiContext) -> Result<Router<ApiContext>, RouteLoadError> {
    let public = Router::new()
        .route("/register", post(register))
        .route("/login", post(login));

    let own = Router::new()
        .route("/me", get(me).put(update_me))
        .route("/me/password", put(change_password))
        .route("/me/bookings", get(my_bookings))
        .route("/logout", post(logout))
        .route_layer(axum::middleware::from_fn(middleware::auth::require_patient));

    let admin = Router::new()
        .route("/", get(list))
        .route("/:id", get(get_one).delete(remove))
        .route_layer(axum::middleware::from_fn(middleware::auth::require_admin));

    Ok(public.merge(own).merge(admin))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
}

/// Fields a patient may change on their own profile.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
}

/// `POST /api/patients/register`
pub async fn register(
    State(ctx): State<ApiContext>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Created<PatientProfile> {
    auth::check_password_strength(&request.password)?;
    accounts::ensure_email_free::<Patient>(&ctx, &request.email)?;

    let password_hash =
        accounts::hash_secret(&request.password, ctx.core.config.password_iterations).await?;
    let patient = Patient {
        name: request.name,
        email: request.email,
        phone: request.phone,
        country: request.country,
        date_of_birth: request.date_of_birth,
        gender: request.gender,
        password_hash,
    };

    let stored = accounts::insert_account(&ctx, patient)?;
    let token = accounts::issue(&ctx, &stored.id, Role::Patient)?;

    tracing::info!(patient_id = %stored.id, "Patient registered");
    Ok(created(
        ApiResponse::ok(PatientProfile::from(&stored))
            .with_token(token)
            .with_message("Registration successful"),
    ))
}

/// `POST /api/patients/login`
pub async fn login(
    State(ctx): State<ApiContext>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<PatientProfile> {
    let (patient, token) = accounts::login::<Patient>(&ctx, &request).await?;
    Ok(Json(
        ApiResponse::ok(PatientProfile::from(&patient)).with_token(token),
    ))
}

pub async fn me(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthContext>,
) -> ApiResult<PatientProfile> {
    let conn = ctx.core.open_db()?;
    let patient = store::get_by_id::<Patient>(&conn, &caller.subject_id)?;
    Ok(Json(ApiResponse::ok(PatientProfile::from(&patient))))
}

/// `PUT /api/patients/me`
pub async fn update_me(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthContext>,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<PatientProfile> {
    let conn = ctx.core.open_db()?;
    let mut patient = store::get_by_id::<Patient>(&conn, &caller.subject_id)?.body;

    if let Some(name) = update.name {
        patient.name = name;
    }
    let blank_to_none = |v: String| if v.trim().is_empty() { None } else { Some(v) };
    if let Some(phone) = update.phone {
        patient.phone = blank_to_none(phone);
    }
    if let Some(country) = update.country {
        patient.country = blank_to_none(country);
    }
    if let Some(dob) = update.date_of_birth {
        patient.date_of_birth = blank_to_none(dob);
    }
    if let Some(gender) = update.gender {
        patient.gender = blank_to_none(gender);
    }

    let stored = store::replace(&conn, &caller.subject_id, patient)?;
    Ok(Json(
        ApiResponse::ok(PatientProfile::from(&stored)).with_message("Profile updated successfully"),
    ))
}

/// `PUT /api/patients/me/password` — other sessions are revoked.
pub async fn change_password(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthContext>,
    ApiJson(change): ApiJson<PasswordChange>,
) -> ApiResult<Value> {
    accounts::change_password::<Patient>(&ctx, &caller.subject_id, &caller.token, &change).await?;
    Ok(Json(
        ApiResponse::ok(json!({})).with_message("Password updated successfully"),
    ))
}

pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthContext>,
) -> ApiResult<Value> {
    accounts::logout(&ctx, &caller.token)?;
    Ok(Json(ApiResponse::ok(json!({})).with_message("Logged out")))
}

/// `GET /api/patients/me/bookings` — bookings linked to the account or
/// submitted with its email.
pub async fn my_bookings(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthContext>,
) -> ApiResult<Vec<Stored<Booking>>> {
    let conn = ctx.core.open_db()?;
    let patient = store::get_by_id::<Patient>(&conn, &caller.subject_id)?;

    let by_id = DocumentFilter::new().text("patientId", Some(patient.id.clone()));
    let by_email = DocumentFilter::new().text("email", Some(patient.body.email.clone()));
    let mut bookings = store::list_all::<Booking>(&conn, &by_id)?;
    for booking in store::list_all::<Booking>(&conn, &by_email)? {
        if !bookings.iter().any(|b| b.id == booking.id) {
            bookings.push(booking);
        }
    }
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let count = bookings.len();
    Ok(Json(ApiResponse::ok(bookings).with_count(count)))
}

/// `GET /api/patients` (admin)
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Vec<PatientProfile>> {
    let filter = DocumentFilter::new().paginate(
        query_number(&params, "page"),
        Some(query_number(&params, "limit").unwrap_or(DEFAULT_PAGE_SIZE)),
    );
    let conn = ctx.core.open_db()?;
    let page = store::list::<Patient>(&conn, &filter)?;

    let profiles: Vec<PatientProfile> = page.items.iter().map(PatientProfile::from).collect();
    let mut response = ApiResponse::ok(profiles).with_count(page.items.len());
    response.total = Some(page.total);
    response.page = Some(page.page);
    response.pages = Some(page.pages);
    Ok(Json(response))
}

pub async fn get_one(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> ApiResult<PatientProfile> {
    let conn = ctx.core.open_db()?;
    let patient = store::find_by_id::<Patient>(&conn, &id)?
        .ok_or_else(|| ApiError::not_found(Patient::ENTITY))?;
    Ok(Json(ApiResponse::ok(PatientProfile::from(&patient))))
}

/// `DELETE /api/patients/:id` — also ends the patient's sessions.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let conn = ctx.core.open_db()?;
    if !store::delete::<Patient>(&conn, &id)? {
        return Err(ApiError::not_found(Patient::ENTITY));
    }
    sessions::revoke_subject_sessions(&conn, &id, Role::Patient, None)?;
    tracing::info!(patient_id = %id, "Patient deleted");
    Ok(Json(
        ApiResponse::ok(json!({ "_id": id })).with_message("Patient deleted successfully"),
    ))
}
