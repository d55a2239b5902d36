//! API router assembly.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Every `/api/<prefix>` is built by its own [`RouteModule`]; a module
//! that fails to build is logged and skipped, and its prefix then falls
//! through to the JSON 404.
//!
//! Layer stack (outermost → innermost):
//! Extension → CORS → catch-panic → [`/api`: request log → database guard
//! → identify] → per-route role checks → handler

use std::any::Any;
use std::path::PathBuf;

use axum::extract::OriginalUri;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use thiserror::Error;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;

use crate::api::crud::{self, Resource};
use crate::api::endpoints::{
    admin, bookings, collections, doctors, headings, health, hospitals, languages, links,
    patients, treatments, upload,
};
use crate::api::error::ApiError;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::config::Config;
use crate::models::{About, Assistance, Blog, Faq, PatientOpinion, ProcedureCost, Service};

/// A route module could not be built.
#[derive(Error, Debug)]
pub enum RouteLoadError {
    #[error("cannot prepare {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type RouteBuilder = fn(&ApiContext) -> Result<Router<ApiContext>, RouteLoadError>;

/// One `/api/<prefix>` router.
pub struct RouteModule {
    pub prefix: &'static str,
    pub build: RouteBuilder,
}

fn crud_module<T: Resource>(_ctx: &ApiContext) -> Result<Router<ApiContext>, RouteLoadError> {
    Ok(crud::routes::<T>())
}

fn slugged_module<T: Resource>(_ctx: &ApiContext) -> Result<Router<ApiContext>, RouteLoadError> {
    Ok(crud::slugged_routes::<T>())
}

pub const ROUTE_MODULES: &[RouteModule] = &[
    RouteModule { prefix: "/about", build: crud_module::<About> },
    RouteModule { prefix: "/services", build: crud_module::<Service> },
    RouteModule { prefix: "/hospitals", build: hospitals::routes },
    RouteModule { prefix: "/procedure-costs", build: crud_module::<ProcedureCost> },
    RouteModule { prefix: "/patient-opinions", build: crud_module::<PatientOpinion> },
    RouteModule { prefix: "/faqs", build: crud_module::<Faq> },
    RouteModule { prefix: "/assistance", build: crud_module::<Assistance> },
    RouteModule { prefix: "/doctors", build: doctors::routes },
    RouteModule { prefix: "/treatments", build: treatments::routes },
    RouteModule { prefix: "/doctor-treatment", build: links::doctor_treatment_routes },
    RouteModule { prefix: "/hospital-treatment", build: links::hospital_treatment_routes },
    RouteModule { prefix: "/booking", build: bookings::routes },
    RouteModule { prefix: "/patients", build: patients::routes },
    RouteModule { prefix: "/admin", build: admin::routes },
    RouteModule { prefix: "/blogs", build: slugged_module::<Blog> },
    RouteModule { prefix: "/headings", build: headings::routes },
    RouteModule { prefix: "/language", build: languages::routes },
    RouteModule { prefix: "/collections", build: collections::routes },
    RouteModule { prefix: "/upload", build: upload::routes },
];

/// Nest every module that builds; log and skip the rest.
pub fn mount_routes(
    mut router: Router<ApiContext>,
    ctx: &ApiContext,
    modules: &[RouteModule],
) -> Router<ApiContext> {
    for module in modules {
        match (module.build)(ctx) {
            Ok(routes) => {
                router = router.nest(module.prefix, routes);
                tracing::info!("Loaded route: /api{}", module.prefix);
            }
            Err(e) => {
                tracing::error!(prefix = module.prefix, error = %e, "Failed to load route");
            }
        }
    }
    router
}

/// Build the full application router.
pub fn api_router(ctx: ApiContext) -> Router {
    build_router(ctx, ROUTE_MODULES)
}

fn build_router(ctx: ApiContext, modules: &[RouteModule]) -> Router {
    let config = ctx.core.config.clone();

    // Layers are applied innermost first.
    let api = mount_routes(
        Router::new().route("/health", get(health::check)),
        &ctx,
        modules,
    )
    .fallback(api_not_found)
    .layer(axum::middleware::from_fn(middleware::auth::identify))
    .layer(axum::middleware::from_fn(middleware::database::guard))
    .layer(axum::middleware::from_fn(middleware::audit::log_request));

    Router::new()
        .route("/", get(health::root))
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(&config.uploads_dir))
        .fallback_service(ServeDir::new(&config.public_dir))
        .with_state(ctx.clone())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer(&config))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(Extension(ctx))
}

/// `{ error: "API endpoint not found", path, attemptedRoute }`
async fn api_not_found(OriginalUri(uri): OriginalUri) -> Response {
    let path = uri.path();
    let attempted = path
        .trim_start_matches("/api")
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default();
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": "API endpoint not found",
            "code": "NOT_FOUND",
            "path": path,
            "attemptedRoute": attempted,
        })),
    )
        .into_response()
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
