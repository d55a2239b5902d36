//! Admin file uploads, served back under `/uploads/<file>`.

use std::path::{Path as FsPath, PathBuf};

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;

use crate::api::error::ApiError;
use crate::api::middleware;
use crate::api::router::RouteLoadError;
use crate::api::types::{created, ApiContext, ApiResponse, ApiResult, Created};

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "pdf"];

/// Fails when the uploads directory cannot be created.
pub fn routes(ctx: &ApiContext) -> Result<Router<ApiContext>, RouteLoadError> {
    let dir = &ctx.core.config.uploads_dir;
    std::fs::create_dir_all(dir).map_err(|source| RouteLoadError::Io {
        path: dir.clone(),
        source,
    })?;

    Ok(Router::new()
        .route("/", post(upload).layer(DefaultBodyLimit::disable()))
        .route("/:filename", delete(remove))
        .route_layer(axum::middleware::from_fn(middleware::auth::require_admin)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub filename: String,
    pub original_name: String,
    pub url: String,
    pub size: usize,
    pub mime_type: String,
}

/// Lowercased extension of `name` if it is an accepted upload type.
fn allowed_extension(name: &str) -> Option<String> {
    let ext = FsPath::new(name).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// A bare file name inside the uploads directory, or `None`.
fn stored_path(dir: &FsPath, filename: &str) -> Option<PathBuf> {
    let plain = !filename.is_empty()
        && !filename.starts_with('.')
        && !filename.contains(['/', '\\'])
        && !filename.contains("..");
    plain.then(|| dir.join(filename))
}

/// `POST /api/upload` — multipart field `file`.
pub async fn upload(State(ctx): State<ApiContext>, mut multipart: Multipart) -> Created<UploadedFile> {
    let limit = ctx.core.config.max_upload_bytes;

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let ext = allowed_extension(&original_name).ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Unsupported file type. Allowed: {}",
                ALLOWED_EXTENSIONS.join(", ")
            ))
        })?;

        let filename = format!("{}.{ext}", uuid::Uuid::new_v4());
        let path = ctx.core.config.uploads_dir.join(&filename);
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| ApiError::Internal(format!("create upload: {e}")))?;

        let mut size = 0usize;
        let written: Result<(), ApiError> = async {
            while let Some(chunk) = field.chunk().await? {
                size += chunk.len();
                if size > limit {
                    return Err(ApiError::PayloadTooLarge(format!(
                        "File exceeds the {limit} byte limit"
                    )));
                }
                file.write_all(&chunk)
                    .await
                    .map_err(|e| ApiError::Internal(format!("write upload: {e}")))?;
            }
            file.flush()
                .await
                .map_err(|e| ApiError::Internal(format!("flush upload: {e}")))
        }
        .await;

        if let Err(err) = written {
            drop(file);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!(%filename, error = %e, "Failed to remove partial upload");
            }
            return Err(err);
        }

        tracing::info!(%filename, size, "File uploaded");
        let uploaded = UploadedFile {
            url: format!("/uploads/{filename}"),
            mime_type: mime_guess::from_ext(&ext).first_or_octet_stream().to_string(),
            filename,
            original_name,
            size,
        };
        return Ok(created(
            ApiResponse::ok(uploaded).with_message("File uploaded successfully"),
        ));
    }

    Err(ApiError::BadRequest("No file uploaded".into()))
}

/// `DELETE /api/upload/:filename`
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(filename): Path<String>,
) -> ApiResult<Value> {
    let path = stored_path(&ctx.core.config.uploads_dir, &filename)
        .ok_or_else(|| ApiError::BadRequest("Invalid filename".into()))?;

    match tokio::fs::remove_file(&path).await {
        Ok(()) => {
            tracing::info!(%filename, "Upload deleted");
            Ok(Json(
                ApiResponse::ok(json!({ "filename": filename }))
                    .with_message("File deleted successfully"),
            ))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::NotFound("File not found".into()))
        }
        Err(e) => Err(ApiError::Internal(format!("delete upload: {e}"))),
    }
}
