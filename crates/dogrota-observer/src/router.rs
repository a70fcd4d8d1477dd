//! Axum router construction.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin client access.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::images;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /today` -- current snapshot
/// - `POST /mark_done` -- report today's walk
/// - `POST /update_children` -- replace the roster
/// - `POST /update_schedule` -- replace the weekday map
/// - `POST /meta` -- update dog name and image
/// - `POST /upload_image` -- store a new dog image
/// - `GET /image` -- serve the dog image
/// - `GET /ws` -- `WebSocket` snapshot stream
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/today", get(handlers::today))
        .route("/mark_done", post(handlers::mark_done))
        .route("/update_children", post(handlers::update_children))
        .route("/update_schedule", post(handlers::update_schedule))
        .route("/meta", post(handlers::update_meta))
        .route(
            "/upload_image",
            post(images::upload_image).layer(DefaultBodyLimit::max(images::MAX_IMAGE_BYTES)),
        )
        .route("/image", get(images::get_image))
        .route("/ws", get(ws::ws_updates))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
