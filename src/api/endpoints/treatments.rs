use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::Connection;
use serde_json::Value;

use crate::api::crud;
use crate::api::endpoints::links;
use crate::api::error::ApiError;
use crate::api::router::RouteLoadError;
use crate::api::types::{ApiContext, ApiResponse, ApiResult};
use crate::db::store;
use crate::models::{Document, Treatment};

pub fn routes(_ctx: &ApiContext) -> Result<Router<ApiContext>, RouteLoadError> {
    Ok(crud::slugged_routes::<Treatment>()
        .route("/:id/doctors", get(doctors))
        .route("/:id/hospitals", get(hospitals)))
}

fn require_treatment(conn: &Connection, id: &str) -> Result<(), ApiError> {
    if store::exists::<Treatment>(conn, id)? {
        Ok(())
    } else {
        Err(ApiError::not_found(Treatment::ENTITY))
    }
}

/// `GET /api/treatments/:id/doctors`
pub async fn doctors(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Value>> {
    let conn = ctx.core.open_db()?;
    require_treatment(&conn, &id)?;
    let items = links::doctors_of_treatment(&conn, &id)?;
    let count = items.len();
    Ok(Json(ApiResponse::ok(items).with_count(count)))
}

/// `GET /api/treatments/:id/hospitals`
pub async fn hospitals(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Value>> {
    let conn = ctx.core.open_db()?;
    require_treatment(&conn, &id)?;
    let items = links::hospitals_of_treatment(&conn, &id)?;
    let count = items.len();
    Ok(Json(ApiResponse::ok(items).with_count(count)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::TestApp;
    use crate::models::{Hospital, HospitalTreatment};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn hospitals_offering_treatment() {
        let app = TestApp::new().await;
        let treatment = app.seed(Treatment {
            name: "Hair Transplant".into(),
            category: Some("Cosmetic".into()),
            ..Default::default()
        });
        let hospital = app.seed(Hospital {
            name: "Estetik".into(),
            country: "Turkey".into(),
            ..Default::default()
        });
        app.seed(HospitalTreatment {
            hospital_id: hospital.id,
            treatment_id: treatment.id.clone(),
            cost: Some(2000.0),
            ..Default::default()
        });

        let response = app
            .get(&format!("/api/treatments/{}/hospitals", treatment.id), None)
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["count"], 1);
        assert_eq!(response.json["data"][0]["hospital"]["name"], "Estetik");

        let response = app
            .get(&format!("/api/treatments/{}/doctors", treatment.id), None)
            .await;
        assert_eq!(response.json["count"], 0);

        let response = app.get("/api/treatments?category=cosmetic", None).await;
        assert_eq!(response.json["count"], 1);

        let response = app.get("/api/treatments/slug/hair-transplant", None).await;
        assert_eq!(response.json["data"]["name"], "Hair Transplant");
    }

    #[tokio::test]
    async fn unknown_treatment_is_404() {
        let app = TestApp::new().await;
        let response = app.get("/api/treatments/nope/doctors", None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}
