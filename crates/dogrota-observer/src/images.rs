//! Dog image upload and retrieval.
//!
//! Uploads are written to `<upload_dir>/dog_image.<ext>`, replacing any
//! previous image, and the `dog_image` meta entry is pointed at the new
//! file. `GET /image` serves the file that entry references, but only
//! while it resolves to a file inside the upload directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use dogrota_types::DOG_IMAGE_KEY;
use serde_json::json;
use tracing::{info, warn};

use crate::error::ObserverError;
use crate::state::AppState;

/// Stem of the stored image file.
const IMAGE_STEM: &str = "dog_image";

/// Maximum accepted upload size in bytes.
pub const MAX_IMAGE_BYTES: usize = 10_485_760;

/// File extension for an uploaded image's `Content-Type`.
///
/// Unknown or missing types fall back to `png`.
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    let mime = content_type
        .and_then(|v| v.split(';').next())
        .map(str::trim)
        .unwrap_or_default();
    match mime {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "png",
    }
}

/// Content type to serve a stored image with, chosen by its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Resolve `reference` to a file inside `upload_dir`.
///
/// Both paths are canonicalized first, so `..` components and symlinks
/// cannot escape the directory. Returns `None` if either path does not
/// exist or the file lies outside `upload_dir`.
pub async fn resolve_in_upload_dir(upload_dir: &Path, reference: &str) -> Option<PathBuf> {
    let dir = tokio::fs::canonicalize(upload_dir).await.ok()?;
    let file = tokio::fs::canonicalize(reference).await.ok()?;
    (file != dir && file.starts_with(&dir)).then_some(file)
}

/// Store the request body as the dog image.
///
/// # Route
///
/// `POST /upload_image`
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ObserverError> {
    if body.is_empty() {
        return Err(ObserverError::InvalidRequest(String::from("empty image body")));
    }

    let ext = extension_for(headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()));
    let path = state.upload_dir.join(format!("{IMAGE_STEM}.{ext}"));

    tokio::fs::create_dir_all(&state.upload_dir).await?;
    tokio::fs::write(&path, &body).await?;

    let file = path.to_string_lossy().into_owned();
    state
        .service
        .update_meta(&[(DOG_IMAGE_KEY, file.as_str())])
        .await?;

    info!(file = %file, bytes = body.len(), "Dog image uploaded");
    Ok(Json(json!({ "status": "ok", "file": file })))
}

/// Serve the current dog image.
///
/// # Route
///
/// `GET /image`
pub async fn get_image(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let meta = state.service.meta().await?;
    let reference = meta.dog_image();
    if reference.is_empty() {
        return Err(ObserverError::NotFound(String::from("no dog image set")));
    }

    let Some(path) = resolve_in_upload_dir(&state.upload_dir, reference).await else {
        warn!(reference, "Dog image is missing or outside the upload directory");
        return Err(ObserverError::NotFound(format!("image file {reference}")));
    };
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ObserverError::NotFound(format!("image file {reference}")));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(([(CONTENT_TYPE, content_type_for(&path))], bytes))
}
