//! REST endpoint handlers.
//!
//! Every handler goes through the shared [`ScheduleService`](crate::ScheduleService),
//! which owns the exclusion boundary and broadcasts each accepted change.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/today` | Current snapshot |
//! | `POST` | `/mark_done` | Report today's walk (form or JSON `name`) |
//! | `POST` | `/update_children` | Replace the roster (form or JSON `children`) |
//! | `POST` | `/update_schedule` | Replace the weekday map |
//! | `POST` | `/meta` | Update dog name and image |

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{FromRequest, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::{Form, Json};
use dogrota_types::{DOG_IMAGE_KEY, DOG_NAME_KEY, WeekdayIndex};
use serde::Deserialize;
use serde_json::json;

use crate::error::ObserverError;
use crate::images::resolve_in_upload_dir;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of `POST /mark_done`.
#[derive(Debug, Deserialize)]
pub struct MarkDoneRequest {
    /// Who walked the dog.
    pub name: String,
}

/// Body of `POST /update_children`.
#[derive(Debug, Deserialize)]
pub struct UpdateChildrenRequest {
    /// The new roster, in rotation order.
    pub children: Vec<String>,
}

/// Body of `POST /meta`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMetaRequest {
    /// New display name of the dog.
    pub dog_name: Option<String>,
    /// New image reference: a file inside the upload directory, or empty.
    pub dog_image: Option<String>,
}

// ---------------------------------------------------------------------------
// GET /today
// ---------------------------------------------------------------------------

/// Return the current snapshot, applying the weekly reset first if due.
pub async fn today(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.service.snapshot().await?;
    Ok(Json(snapshot))
}

// ---------------------------------------------------------------------------
// POST /mark_done
// ---------------------------------------------------------------------------

/// Record that a participant walked the dog today.
///
/// Accepts either a urlencoded form or a JSON body with a `name` field.
pub async fn mark_done(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<impl IntoResponse, ObserverError> {
    let body = parse_mark_done(request).await?;
    state.service.mark_done(&body.name).await?;
    Ok(Json(json!({ "status": "ok" })))
}

fn is_json(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

async fn parse_mark_done(request: Request) -> Result<MarkDoneRequest, ObserverError> {
    if is_json(&request) {
        let Json(body) = Json::<MarkDoneRequest>::from_request(request, &())
            .await
            .map_err(|e| ObserverError::InvalidRequest(e.body_text()))?;
        Ok(body)
    } else {
        let Form(body) = Form::<MarkDoneRequest>::from_request(request, &())
            .await
            .map_err(|e| ObserverError::InvalidRequest(e.body_text()))?;
        Ok(body)
    }
}

// ---------------------------------------------------------------------------
// POST /update_children
// ---------------------------------------------------------------------------

/// Replace the roster and return it as stored.
///
/// Accepts a JSON `children` array or a urlencoded form repeating the
/// `children` field once per name, in rotation order.
pub async fn update_children(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<impl IntoResponse, ObserverError> {
    let body = parse_update_children(request).await?;
    let snapshot = state.service.replace_roster(&body.children).await?;
    Ok(Json(json!({ "status": "ok", "children": snapshot.roster })))
}

async fn parse_update_children(request: Request) -> Result<UpdateChildrenRequest, ObserverError> {
    if is_json(&request) {
        let Json(body) = Json::<UpdateChildrenRequest>::from_request(request, &())
            .await
            .map_err(|e| ObserverError::InvalidRequest(e.body_text()))?;
        return Ok(body);
    }

    // Urlencoded forms carry a list as repeated keys, which only a pair
    // sequence preserves.
    let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &())
        .await
        .map_err(|e| ObserverError::InvalidRequest(e.body_text()))?;
    Ok(children_from_pairs(pairs))
}

fn children_from_pairs(pairs: Vec<(String, String)>) -> UpdateChildrenRequest {
    let children = pairs
        .into_iter()
        .filter(|(key, _)| key == "children" || key == "children[]")
        .map(|(_, name)| name)
        .collect();
    UpdateChildrenRequest { children }
}

// ---------------------------------------------------------------------------
// POST /update_schedule
// ---------------------------------------------------------------------------

/// Replace the static weekday map.
///
/// The body maps weekday keys `"0"`..`"6"` (Sunday first) to
/// `[name, completed]` pairs.
pub async fn update_schedule(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BTreeMap<String, (String, bool)>>,
) -> Result<impl IntoResponse, ObserverError> {
    let mapping = parse_weekday_map(body)?;
    state.service.replace_weekday_map(&mapping).await?;
    let schedule: BTreeMap<String, (String, bool)> = mapping
        .into_iter()
        .map(|(weekday, entry)| (weekday.to_string(), entry))
        .collect();
    Ok(Json(json!({ "status": "ok", "schedule": schedule })))
}

fn parse_weekday_map(
    body: BTreeMap<String, (String, bool)>,
) -> Result<BTreeMap<WeekdayIndex, (String, bool)>, ObserverError> {
    body.into_iter()
        .map(|(key, entry)| {
            key.trim()
                .parse::<u8>()
                .ok()
                .and_then(WeekdayIndex::new)
                .map(|weekday| (weekday, entry))
                .ok_or_else(|| ObserverError::InvalidRequest(format!("invalid weekday key: {key}")))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// POST /meta
// ---------------------------------------------------------------------------

/// Update the dog's name and/or image reference.
///
/// A non-empty `dog_image` must resolve to an existing file inside the
/// upload directory; an empty one clears the image.
pub async fn update_meta(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdateMetaRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let mut entries = Vec::new();
    if let Some(name) = body.dog_name.as_deref() {
        entries.push((DOG_NAME_KEY, name));
    }
    if let Some(image) = body.dog_image.as_deref() {
        if !image.is_empty() && resolve_in_upload_dir(&state.upload_dir, image).await.is_none() {
            return Err(ObserverError::InvalidRequest(format!(
                "dog_image must name an uploaded file: {image}"
            )));
        }
        entries.push((DOG_IMAGE_KEY, image));
    }
    if entries.is_empty() {
        return Err(ObserverError::InvalidRequest(String::from(
            "expected dog_name or dog_image",
        )));
    }

    let snapshot = state.service.update_meta(&entries).await?;
    Ok(Json(json!({ "status": "ok", "meta": snapshot.meta })))
}
