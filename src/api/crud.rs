//! Generic CRUD handlers shared by every document resource.
//!
//! A resource router built by [`routes`] answers:
//! - `GET /`, `GET /all` — listing with `language`, `page`, `limit` and
//!   the resource's equality filters
//! - `GET /:id`
//! - `POST /`, `PUT /:id`, `PATCH /:id`, `DELETE /:id` — admin token

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use rusqlite::Connection;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::middleware;
use crate::api::types::{
    created, is_admin, query_number, query_text, ApiContext, ApiJson, ApiResponse, ApiResult,
    AuthContext, Created, QueryParams, DEFAULT_PAGE_SIZE,
};
use crate::db::store::{self, DocumentFilter};
use crate::models::{
    About, AdminContent, Assistance, Blog, Booking, Doctor, DoctorTreatment, Document, Faq,
    HeadingEntry, Hospital, HospitalTreatment, PatientOpinion, ProcedureCost, Service, Stored,
    Treatment,
};

/// A document type exposed over HTTP.
pub trait Resource: Document {
    /// Query parameters accepted as case-insensitive equality filters.
    const FILTERS: &'static [&'static str] = &[];
    /// Body field listings are sorted by (ascending, nulls last).
    const SORT_FIELD: Option<&'static str> = None;

    /// Narrow a listing for callers without an admin token.
    fn public_scope(filter: DocumentFilter) -> DocumentFilter {
        filter
    }

    /// Whether a non-admin caller may read this document.
    fn publicly_visible(&self) -> bool {
        true
    }

    /// Cross-document checks run before every write. `id` is the
    /// document being replaced, if any.
    fn check_write(&self, _conn: &Connection, _id: Option<&str>) -> Result<(), ApiError> {
        Ok(())
    }
}

impl Resource for About {}
impl Resource for Service {}
impl Resource for Assistance {}
impl Resource for PatientOpinion {}

impl Resource for Hospital {
    const FILTERS: &'static [&'static str] = &["country", "city"];
}

impl Resource for ProcedureCost {
    const FILTERS: &'static [&'static str] = &["country"];
}

impl Resource for Faq {
    const FILTERS: &'static [&'static str] = &["category"];
    const SORT_FIELD: Option<&'static str> = Some("order");
}

impl Resource for Doctor {
    const FILTERS: &'static [&'static str] = &["hospitalId", "specialty"];

    fn check_write(&self, conn: &Connection, _id: Option<&str>) -> Result<(), ApiError> {
        if let Some(hospital_id) = self.hospital_id.as_deref() {
            require_exists::<Hospital>(conn, hospital_id)?;
        }
        Ok(())
    }
}

impl Resource for Treatment {
    const FILTERS: &'static [&'static str] = &["category"];
}

impl Resource for DoctorTreatment {
    const FILTERS: &'static [&'static str] = &["doctorId", "treatmentId"];

    fn check_write(&self, conn: &Connection, _id: Option<&str>) -> Result<(), ApiError> {
        require_exists::<Doctor>(conn, &self.doctor_id)?;
        require_exists::<Treatment>(conn, &self.treatment_id)
    }
}

impl Resource for HospitalTreatment {
    const FILTERS: &'static [&'static str] = &["hospitalId", "treatmentId"];

    fn check_write(&self, conn: &Connection, _id: Option<&str>) -> Result<(), ApiError> {
        require_exists::<Hospital>(conn, &self.hospital_id)?;
        require_exists::<Treatment>(conn, &self.treatment_id)
    }
}

impl Resource for Blog {
    const FILTERS: &'static [&'static str] = &["author"];

    fn public_scope(filter: DocumentFilter) -> DocumentFilter {
        filter.flag("published", true)
    }

    fn publicly_visible(&self) -> bool {
        self.published
    }
}

impl Resource for AdminContent {
    const FILTERS: &'static [&'static str] = &["section"];
}

impl Resource for HeadingEntry {
    const FILTERS: &'static [&'static str] = &["section", "pageType"];

    fn check_write(&self, conn: &Connection, id: Option<&str>) -> Result<(), ApiError> {
        let filter = DocumentFilter::new()
            .language(Some(self.language.clone()))
            .text("section", Some(self.section.clone()))
            .text("pageType", Some(self.page_type.as_str().to_string()));
        let clash = store::list_all::<HeadingEntry>(conn, &filter)?
            .into_iter()
            .any(|existing| Some(existing.id.as_str()) != id);
        if clash {
            return Err(ApiError::Conflict(format!(
                "Headings for section '{}', page type '{}' and language '{}' already exist",
                self.section,
                self.page_type.as_str(),
                self.language
            )));
        }
        Ok(())
    }
}

impl Resource for Booking {
    const FILTERS: &'static [&'static str] = &["status", "email"];

    fn check_write(&self, conn: &Connection, _id: Option<&str>) -> Result<(), ApiError> {
        if let Some(id) = self.hospital_id.as_deref() {
            require_exists::<Hospital>(conn, id)?;
        }
        if let Some(id) = self.doctor_id.as_deref() {
            require_exists::<Doctor>(conn, id)?;
        }
        if let Some(id) = self.treatment_id.as_deref() {
            require_exists::<Treatment>(conn, id)?;
        }
        Ok(())
    }
}

/// Referenced document must exist, else 400 naming the missing entity.
pub fn require_exists<T: Document>(conn: &Connection, id: &str) -> Result<(), ApiError> {
    if store::exists::<T>(conn, id)? {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("{} not found: {id}", T::ENTITY)))
    }
}

/// The standard route set: public reads, admin writes.
pub fn routes<T: Resource>() -> Router<ApiContext> {
    let public = Router::new()
        .route("/", get(list::<T>))
        .route("/all", get(list_all::<T>))
        .route("/:id", get(get_one::<T>));
    public.merge(admin_writes::<T>())
}

/// [`routes`] plus `GET /slug/:slug`.
pub fn slugged_routes<T: Resource>() -> Router<ApiContext> {
    routes::<T>().route("/slug/:slug", get(get_by_slug::<T>))
}

/// Create, update and delete, all behind an admin token.
pub fn admin_writes<T: Resource>() -> Router<ApiContext> {
    Router::new()
        .route("/", post(create::<T>))
        .route(
            "/:id",
            axum::routing::put(update::<T>)
                .patch(update::<T>)
                .delete(remove::<T>),
        )
        .route_layer(axum::middleware::from_fn(middleware::auth::require_admin))
}

/// Listing filter from query parameters. `default_limit` applies when the
/// request has no `limit`.
pub fn listing_filter<T: Resource>(
    params: &QueryParams,
    admin: bool,
    default_limit: Option<u32>,
) -> DocumentFilter {
    let mut filter = DocumentFilter::new()
        .language(query_text(params, "language"))
        .paginate(
            query_number(params, "page"),
            query_number(params, "limit").or(default_limit),
        );
    for field in T::FILTERS {
        filter = filter.text(field, query_text(params, field));
    }
    if let Some(field) = T::SORT_FIELD {
        filter = filter.sort_by(field);
    }
    if admin {
        filter
    } else {
        T::public_scope(filter)
    }
}

pub async fn list<T: Resource>(
    State(ctx): State<ApiContext>,
    caller: Option<Extension<AuthContext>>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Vec<Stored<T>>> {
    let filter = listing_filter::<T>(&params, is_admin(&caller), Some(DEFAULT_PAGE_SIZE));
    let conn = ctx.core.open_db()?;
    let page = store::list::<T>(&conn, &filter)?;
    Ok(Json(ApiResponse::page(page)))
}

pub async fn list_all<T: Resource>(
    State(ctx): State<ApiContext>,
    caller: Option<Extension<AuthContext>>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Vec<Stored<T>>> {
    let filter = listing_filter::<T>(&params, is_admin(&caller), None);
    let conn = ctx.core.open_db()?;
    let page = store::list::<T>(&conn, &filter)?;
    Ok(Json(ApiResponse::page(page)))
}

pub async fn get_one<T: Resource>(
    State(ctx): State<ApiContext>,
    caller: Option<Extension<AuthContext>>,
    Path(id): Path<String>,
) -> ApiResult<Stored<T>> {
    let conn = ctx.core.open_db()?;
    let doc = store::find_by_id::<T>(&conn, &id)?
        .filter(|doc| is_admin(&caller) || doc.body.publicly_visible())
        .ok_or_else(|| ApiError::not_found(T::ENTITY))?;
    Ok(Json(ApiResponse::ok(doc)))
}

/// `GET /slug/:slug`
pub async fn get_by_slug<T: Resource>(
    State(ctx): State<ApiContext>,
    caller: Option<Extension<AuthContext>>,
    Path(slug): Path<String>,
) -> ApiResult<Stored<T>> {
    let conn = ctx.core.open_db()?;
    let doc = store::find_by_slug::<T>(&conn, &slug)?
        .filter(|doc| is_admin(&caller) || doc.body.publicly_visible())
        .ok_or_else(|| ApiError::not_found(T::ENTITY))?;
    Ok(Json(ApiResponse::ok(doc)))
}

pub async fn create<T: Resource>(
    State(ctx): State<ApiContext>,
    ApiJson(mut doc): ApiJson<T>,
) -> Created<Stored<T>> {
    doc.normalize();
    doc.validate()?;
    let conn = ctx.core.open_db()?;
    doc.check_write(&conn, None)?;
    let stored = store::insert(&conn, doc)?;
    tracing::info!(collection = T::COLLECTION, id = %stored.id, "Document created");
    Ok(created(
        ApiResponse::ok(stored).with_message(format!("{} created successfully", T::ENTITY)),
    ))
}

pub async fn update<T: Resource>(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<Value>,
) -> ApiResult<Stored<T>> {
    let conn = ctx.core.open_db()?;
    let doc = store::merged::<T>(&conn, &id, &patch)?;
    doc.validate()?;
    doc.check_write(&conn, Some(&id))?;
    let stored = store::replace(&conn, &id, doc)?;
    Ok(Json(
        ApiResponse::ok(stored).with_message(format!("{} updated successfully", T::ENTITY)),
    ))
}

pub async fn remove<T: Resource>(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let conn = ctx.core.open_db()?;
    if !store::delete::<T>(&conn, &id)? {
        return Err(ApiError::not_found(T::ENTITY));
    }
    tracing::info!(collection = T::COLLECTION, %id, "Document deleted");
    Ok(Json(
        ApiResponse::ok(json!({ "_id": id }))
            .with_message(format!("{} deleted successfully", T::ENTITY)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::TestApp;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn create_requires_admin() {
        let app = TestApp::new().await;
        let body = json!({ "name": "Acibadem", "country": "Turkey" });

        let response = app.post("/api/hospitals", None, &body).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);

        let patient = app.patient_token("p@example.com").await;
        let response = app.post("/api/hospitals", Some(&patient), &body).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);

        let response = app.post("/api/hospitals", Some(&app.admin_token), &body).await;
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.json["success"], true);
        assert_eq!(response.json["data"]["slug"], "acibadem");
        assert!(response.json["data"]["_id"].is_string());
    }

    #[tokio::test]
    async fn create_validates_and_ignores_unknown_fields() {
        let app = TestApp::new().await;
        let response = app
            .post("/api/hospitals", Some(&app.admin_token), &json!({ "name": "A" }))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["error"], "country is required");

        let response = app
            .post(
                "/api/hospitals",
                Some(&app.admin_token),
                &json!({ "name": "A", "country": "B", "unknownField": 1 }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        assert!(response.json["data"].get("unknownField").is_none());
    }

    #[tokio::test]
    async fn malformed_json_uses_error_envelope() {
        let app = TestApp::new().await;
        let response = app
            .send_raw("POST", "/api/faqs", Some(&app.admin_token), "{not json")
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["success"], false);
    }

    #[tokio::test]
    async fn listing_filters_and_pages() {
        let app = TestApp::new().await;
        for (name, country) in [("A", "Turkey"), ("B", "India"), ("C", "turkey")] {
            app.seed(Hospital {
                name: name.into(),
                country: country.into(),
                language: Some("EN".into()),
                ..Default::default()
            });
        }

        let response = app.get("/api/hospitals?country=TURKEY", None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["count"], 2);
        assert_eq!(response.json["total"], 2);

        let response = app.get("/api/hospitals?limit=1&page=2", None).await;
        assert_eq!(response.json["count"], 1);
        assert_eq!(response.json["pages"], 3);
        assert_eq!(response.json["page"], 2);

        let response = app.get("/api/hospitals/all?language=en", None).await;
        assert_eq!(response.json["count"], 3);

        let response = app.get("/api/hospitals?language=AR", None).await;
        assert_eq!(response.json["count"], 0);
    }

    #[tokio::test]
    async fn get_update_delete_by_id() {
        let app = TestApp::new().await;
        let id = app
            .seed(Service {
                title: "Visa support".into(),
                ..Default::default()
            })
            .id;

        let response = app.get(&format!("/api/services/{id}"), None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["data"]["title"], "Visa support");

        let response = app
            .send(
                "PATCH",
                &format!("/api/services/{id}"),
                Some(&app.admin_token),
                &json!({ "icon": "passport", "_id": "other" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["data"]["icon"], "passport");
        assert_eq!(response.json["data"]["_id"], id.as_str());

        let response = app
            .send("DELETE", &format!("/api/services/{id}"), Some(&app.admin_token), &json!({}))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["data"]["_id"], id.as_str());

        let response = app.get(&format!("/api/services/{id}"), None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.json["error"], "Service not found");
    }

    #[tokio::test]
    async fn faqs_sorted_by_order() {
        let app = TestApp::new().await;
        for (question, order) in [("third", None), ("second", Some(2)), ("first", Some(1))] {
            app.seed(Faq {
                question: question.into(),
                answer: "a".into(),
                order,
                ..Default::default()
            });
        }
        let response = app.get("/api/faqs", None).await;
        let questions: Vec<_> = response.json["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["question"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(questions, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn unpublished_blogs_hidden_from_public() {
        let app = TestApp::new().await;
        let draft = app
            .seed(Blog {
                title: "Draft".into(),
                content: "x".into(),
                published: false,
                ..Default::default()
            })
            .id;
        app.seed(Blog {
            title: "Live".into(),
            content: "x".into(),
            ..Default::default()
        });

        let response = app.get("/api/blogs", None).await;
        assert_eq!(response.json["count"], 1);
        let response = app.get("/api/blogs", Some(&app.admin_token)).await;
        assert_eq!(response.json["count"], 2);

        let response = app.get(&format!("/api/blogs/{draft}"), None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        let response = app.get(&format!("/api/blogs/{draft}"), Some(&app.admin_token)).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn doctor_hospital_reference_checked() {
        let app = TestApp::new().await;
        let response = app
            .post(
                "/api/doctors",
                Some(&app.admin_token),
                &json!({ "name": "Dr. A", "specialty": "Cardiology", "hospitalId": "missing" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["error"], "Hospital not found: missing");
    }
}
