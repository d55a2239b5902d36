//! Doctor↔treatment and hospital↔treatment link endpoints.
//!
//! Link listings are returned with the far-side document embedded under
//! its entity key, e.g. `{ ...link, "treatment": { ...treatment } }`.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::Connection;
use serde_json::Value;

use crate::api::crud::{self, Resource};
use crate::api::error::ApiError;
use crate::api::router::RouteLoadError;
use crate::api::types::{ApiContext, ApiResponse, ApiResult};
use crate::db::store::{self, DocumentFilter};
use crate::models::{Doctor, DoctorTreatment, Hospital, HospitalTreatment, Treatment};

pub fn doctor_treatment_routes(_ctx: &ApiContext) -> Result<Router<ApiContext>, RouteLoadError> {
    Ok(crud::routes::<DoctorTreatment>()
        .route("/doctor/:doctor_id", get(by_doctor))
        .route("/treatment/:treatment_id", get(doctor_links_by_treatment)))
}

pub fn hospital_treatment_routes(_ctx: &ApiContext) -> Result<Router<ApiContext>, RouteLoadError> {
    Ok(crud::routes::<HospitalTreatment>()
        .route("/hospital/:hospital_id", get(by_hospital))
        .route("/treatment/:treatment_id", get(hospital_links_by_treatment)))
}

/// Links of `L` whose `field` equals `id`, each with its `T` embedded at `key`.
pub fn linked<L, T>(
    conn: &Connection,
    field: &str,
    id: &str,
    key: &str,
    target_id: impl Fn(&L) -> &str,
) -> Result<Vec<Value>, ApiError>
where
    L: Resource,
    T: Resource,
{
    let filter = DocumentFilter::new()
        .text(field, Some(id.to_string()))
        .oldest_first();
    let links = store::list_all::<L>(conn, &filter)?;

    let mut out = Vec::with_capacity(links.len());
    for link in links {
        let target = store::find_by_id::<T>(conn, target_id(&link.body))?;
        let mut value = serde_json::to_value(&link)?;
        if let Value::Object(fields) = &mut value {
            fields.insert(key.to_string(), serde_json::to_value(target)?);
        }
        out.push(value);
    }
    Ok(out)
}

pub fn treatments_of_doctor(conn: &Connection, doctor_id: &str) -> Result<Vec<Value>, ApiError> {
    linked::<DoctorTreatment, Treatment>(conn, "doctorId", doctor_id, "treatment", |l| {
        l.treatment_id.as_str()
    })
}

pub fn doctors_of_treatment(conn: &Connection, treatment_id: &str) -> Result<Vec<Value>, ApiError> {
    linked::<DoctorTreatment, Doctor>(conn, "treatmentId", treatment_id, "doctor", |l| {
        l.doctor_id.as_str()
    })
}

pub fn treatments_of_hospital(conn: &Connection, hospital_id: &str) -> Result<Vec<Value>, ApiError> {
    linked::<HospitalTreatment, Treatment>(conn, "hospitalId", hospital_id, "treatment", |l| {
        l.treatment_id.as_str()
    })
}

pub fn hospitals_of_treatment(
    conn: &Connection,
    treatment_id: &str,
) -> Result<Vec<Value>, ApiError> {
    linked::<HospitalTreatment, Hospital>(conn, "treatmentId", treatment_id, "hospital", |l| {
        l.hospital_id.as_str()
    })
}

fn listing(items: Vec<Value>) -> Json<ApiResponse<Vec<Value>>> {
    let count = items.len();
    Json(ApiResponse::ok(items).with_count(count))
}

/// `GET /api/doctor-treatment/doctor/:doctor_id`
pub async fn by_doctor(
    State(ctx): State<ApiContext>,
    Path(doctor_id): Path<String>,
) -> ApiResult<Vec<Value>> {
    let conn = ctx.core.open_db()?;
    Ok(listing(treatments_of_doctor(&conn, &doctor_id)?))
}

/// `GET /api/doctor-treatment/treatment/:treatment_id`
pub async fn doctor_links_by_treatment(
    State(ctx): State<ApiContext>,
    Path(treatment_id): Path<String>,
) -> ApiResult<Vec<Value>> {
    let conn = ctx.core.open_db()?;
    Ok(listing(doctors_of_treatment(&conn, &treatment_id)?))
}

/// `GET /api/hospital-treatment/hospital/:hospital_id`
pub async fn by_hospital(
    State(ctx): State<ApiContext>,
    Path(hospital_id): Path<String>,
) -> ApiResult<Vec<Value>> {
    let conn = ctx.core.open_db()?;
    Ok(listing(treatments_of_hospital(&conn, &hospital_id)?))
}

/// `GET /api/hospital-treatment/treatment/:treatment_id`
pub async fn hospital_links_by_treatment(
    State(ctx): State<ApiContext>,
    Path(treatment_id): Path<String>,
) -> ApiResult<Vec<Value>> {
    let conn = ctx.core.open_db()?;
    Ok(listing(hospitals_of_treatment(&conn, &treatment_id)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::TestApp;
    use axum::http::StatusCode;
    use serde_json::json;

    fn seed_pair(app: &TestApp) -> (String, String) {
        let doctor = app.seed(Doctor {
            name: "Dr. Yilmaz".into(),
            specialty: "Orthopedics".into(),
            ..Default::default()
        });
        let treatment = app.seed(Treatment {
            name: "Knee Replacement".into(),
            ..Default::default()
        });
        (doctor.id, treatment.id)
    }

    #[tokio::test]
    async fn link_requires_existing_documents() {
        let app = TestApp::new().await;
        let (doctor_id, _) = seed_pair(&app);
        let response = app
            .post(
                "/api/doctor-treatment",
                Some(&app.admin_token),
                &json!({ "doctorId": doctor_id, "treatmentId": "nope" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["error"], "Treatment not found: nope");
    }

    #[tokio::test]
    async fn links_embed_far_side() {
        let app = TestApp::new().await;
        let (doctor_id, treatment_id) = seed_pair(&app);
        let response = app
            .post(
                "/api/doctor-treatment",
                Some(&app.admin_token),
                &json!({ "doctorId": doctor_id, "treatmentId": treatment_id, "cost": 4500.0 }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);

        let response = app
            .get(&format!("/api/doctor-treatment/doctor/{doctor_id}"), None)
            .await;
        assert_eq!(response.json["count"], 1);
        assert_eq!(response.json["data"][0]["treatment"]["name"], "Knee Replacement");
        assert_eq!(response.json["data"][0]["cost"], 4500.0);

        let response = app
            .get(&format!("/api/doctor-treatment/treatment/{treatment_id}"), None)
            .await;
        assert_eq!(response.json["data"][0]["doctor"]["name"], "Dr. Yilmaz");
    }

    #[tokio::test]
    async fn hospital_links_round_trip() {
        let app = TestApp::new().await;
        let hospital = app.seed(Hospital {
            name: "Memorial".into(),
            country: "Turkey".into(),
            ..Default::default()
        });
        let treatment = app.seed(Treatment {
            name: "IVF".into(),
            ..Default::default()
        });
        app.seed(HospitalTreatment {
            hospital_id: hospital.id.clone(),
            treatment_id: treatment.id.clone(),
            ..Default::default()
        });

        let response = app
            .get(&format!("/api/hospital-treatment/hospital/{}", hospital.id), None)
            .await;
        assert_eq!(response.json["data"][0]["treatment"]["name"], "IVF");

        let response = app
            .get(&format!("/api/hospital-treatment/treatment/{}", treatment.id), None)
            .await;
        assert_eq!(response.json["data"][0]["hospital"]["name"], "Memorial");
    }
}
