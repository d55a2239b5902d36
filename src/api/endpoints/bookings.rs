//! Consultation bookings.
//!
//! Anyone may submit a booking. A caller with a patient token gets the
//! booking linked to their account. Everything else is admin-only.

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;

use crate::api::crud::{self, Resource};
use crate::api::error::ApiError;
use crate::api::middleware;
use crate::api::router::RouteLoadError;
use crate::api::types::{created, ApiContext, ApiJson, ApiResponse, ApiResult, AuthContext, Created};
use crate::db::sessions::Role;
use crate::db::store;
use crate::models::{Booking, BookingStatus, Document, Patient, Stored};

pub fn routes(_ctx: &ApiContext) -> Result<Router<ApiContext>, RouteLoadError> {
    let admin = Router::new()
        .route("/", get(crud::list::<Booking>))
        .route(
            "/:id",
            get(crud::get_one::<Booking>)
                .put(crud::update::<Booking>)
                .delete(crud::remove::<Booking>),
        )
        .route("/:id/status", patch(set_status))
        .route_layer(axum::middleware::from_fn(middleware::auth::require_admin));

    Ok(Router::new().route("/", post(submit)).merge(admin))
}

/// `POST /api/booking`
pub async fn submit(
    State(ctx): State<ApiContext>,
    caller: Option<Extension<AuthContext>>,
    ApiJson(mut booking): ApiJson<Booking>,
) -> Created<Stored<Booking>> {
    let conn = ctx.core.open_db()?;

    if let Some(Extension(caller)) = caller.filter(|c| c.role == Role::Patient) {
        let patient = store::get_by_id::<Patient>(&conn, &caller.subject_id)?;
        if booking.name.trim().is_empty() {
            booking.name = patient.body.name;
        }
        if booking.email.trim().is_empty() {
            booking.email = patient.body.email;
        }
        booking.patient_id = Some(patient.id);
    } else {
        booking.patient_id = None;
    }
    booking.status = BookingStatus::Pending;

    booking.normalize();
    booking.validate()?;
    booking.check_write(&conn, None)?;
    let stored = store::insert(&conn, booking)?;

    tracing::info!(
        booking_id = %stored.id,
        linked = stored.body.patient_id.is_some(),
        "Booking submitted"
    );
    Ok(created(
        ApiResponse::ok(stored).with_message("Booking submitted successfully"),
    ))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// `PATCH /api/booking/:id/status`
pub async fn set_status(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> ApiResult<Stored<Booking>> {
    let status = BookingStatus::from_str(&request.status)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid status: {}", request.status)))?;

    let conn = ctx.core.open_db()?;
    let mut booking = store::get_by_id::<Booking>(&conn, &id)?.body;
    booking.status = status;
    let stored = store::replace(&conn, &id, booking)?;

    tracing::info!(booking_id = %id, status = status.as_str(), "Booking status changed");
    Ok(Json(
        ApiResponse::ok(stored).with_message(format!("Booking {}", status.as_str())),
    ))
}
