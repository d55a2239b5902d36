//! Hospital endpoints: standard CRUD, slug lookup and country list.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::crud;
use crate::api::router::RouteLoadError;
use crate::api::types::{query_text, ApiContext, ApiResponse, ApiResult, QueryParams};
use crate::db::store::{self, DocumentFilter};
use crate::models::Hospital;

pub fn routes(_ctx: &ApiContext) -> Result<Router<ApiContext>, RouteLoadError> {
    Ok(crud::slugged_routes::<Hospital>().route("/countries", get(countries)))
}

/// `GET /api/hospitals/countries` — distinct countries, optionally per language.
pub async fn countries(
    State(ctx): State<ApiContext>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Vec<String>> {
    let filter = DocumentFilter::new().language(query_text(&params, "language"));
    let conn = ctx.core.open_db()?;
    let countries = store::distinct_text::<Hospital>(&conn, "country", &filter)?;
    let count = countries.len();
    Ok(Json(ApiResponse::ok(countries).with_count(count)))
}
