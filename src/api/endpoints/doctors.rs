use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;

use crate::api::crud;
use crate::api::endpoints::links;
use crate::api::error::ApiError;
use crate::api::router::RouteLoadError;
use crate::api::types::{ApiContext, ApiResponse, ApiResult};
use crate::db::store;
use crate::models::{Doctor, Document};

pub fn routes(_ctx: &ApiContext) -> Result<Router<ApiContext>, RouteLoadError> {
    Ok(crud::slugged_routes::<Doctor>().route("/:id/treatments", get(treatments)))
}

/// `GET /api/doctors/:id/treatments`
pub async fn treatments(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Value>> {
    let conn = ctx.core.open_db()?;
    if !store::exists::<Doctor>(&conn, &id)? {
        return Err(ApiError::not_found(Doctor::ENTITY));
    }
    let items = links::treatments_of_doctor(&conn, &id)?;
    let count = items.len();
    Ok(Json(ApiResponse::ok(items).with_count(count)))
}
