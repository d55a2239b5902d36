//! Heading entries plus the per-section bundle used by the frontend.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::crud;
use crate::api::error::ApiError;
use crate::api::router::RouteLoadError;
use crate::api::types::{ApiContext, ApiResponse, ApiResult};
use crate::db::store::{self, DocumentFilter};
use crate::models::{HeadingBundle, HeadingEntry};

pub fn routes(_ctx: &ApiContext) -> Result<Router<ApiContext>, RouteLoadError> {
    // The section segment shares its name with the CRUD `:id` routes.
    Ok(crud::routes::<HeadingEntry>().route("/:id/:lang", get(bundle)))
}

/// `GET /api/headings/:section/:lang`
pub async fn bundle(
    State(ctx): State<ApiContext>,
    Path((section, lang)): Path<(String, String)>,
) -> ApiResult<HeadingBundle> {
    let filter = DocumentFilter::new()
        .text("section", Some(section.clone()))
        .language(Some(lang.clone()))
        .oldest_first();

    let conn = ctx.core.open_db()?;
    let entries = store::list_all::<HeadingEntry>(&conn, &filter)?;
    if entries.is_empty() {
        return Err(ApiError::NotFound(format!(
            "Headings not found for section '{section}' and language '{lang}'"
        )));
    }

    let bundle = HeadingBundle::assemble(entries.iter().map(|e| &e.body));
    Ok(Json(ApiResponse::ok(bundle)))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::TestApp;
    use axum::http::StatusCode;
    use serde_json::json;

    fn entry(page_type: &str, heading: &str) -> serde_json::Value {
        let mut body = json!({
            "section": "hospital",
            "pageType": page_type,
            "language": "EN",
            "headings": [{ "heading": heading, "subheading": "", "description": "" }]
        });
        if page_type == "detailPage" {
            body["navbar"] = json!(["Overview", "Doctors"]);
        }
        body
    }

    #[tokio::test]
    async fn bundle_groups_page_types() {
        let app = TestApp::new().await;
        for (page_type, heading) in [
            ("home", "Top Hospitals"),
            ("page", "All Hospitals"),
            ("detailPage", "About"),
        ] {
            let response = app
                .post("/api/headings", Some(&app.admin_token), &entry(page_type, heading))
                .await;
            assert_eq!(response.status, StatusCode::CREATED);
        }

        let response = app.get("/api/headings/hospital/en", None).await;
        assert_eq!(response.status, StatusCode::OK);
        let data = &response.json["data"];
        assert_eq!(data["home"][0]["heading"], "Top Hospitals");
        assert_eq!(data["page"][0]["heading"], "All Hospitals");
        assert_eq!(data["detailPage"]["navbar"], json!(["Overview", "Doctors"]));
        assert_eq!(data["detailPage"]["headings"][0]["heading"], "About");
    }

    #[tokio::test]
    async fn duplicate_triple_conflicts() {
        let app = TestApp::new().await;
        let first = app
            .post("/api/headings", Some(&app.admin_token), &entry("home", "One"))
            .await;
        assert_eq!(first.status, StatusCode::CREATED);

        let second = app
            .post("/api/headings", Some(&app.admin_token), &entry("home", "Two"))
            .await;
        assert_eq!(second.status, StatusCode::CONFLICT);

        // Updating the existing entry in place is not a clash.
        let id = first.json["data"]["_id"].as_str().unwrap();
        let response = app
            .send(
                "PUT",
                &format!("/api/headings/{id}"),
                Some(&app.admin_token),
                &json!({ "headings": [{ "heading": "Renamed" }] }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_bundle_is_404() {
        let app = TestApp::new().await;
        let response = app.get("/api/headings/doctor/FR", None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(
            response.json["error"],
            "Headings not found for section 'doctor' and language 'FR'"
        );
    }
}
