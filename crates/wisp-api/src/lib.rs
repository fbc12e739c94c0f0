pub mod admin;
pub mod client;
pub mod error;
pub mod extract;
pub mod messages;
pub mod notes;
pub mod rate_limit;
pub mod reaper;
pub mod rooms;
pub mod state;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::state::AppState;

/// Largest accepted JSON body. Payload limits proper are enforced per field.
const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/notes", post(notes::create_note))
        .route("/api/notes/{id}", get(notes::note_metadata))
        .route("/api/notes/{id}/read", post(notes::read_note))
        .route("/api/rooms", get(rooms::list_rooms))
        .route("/api/rooms/temporary", post(rooms::create_temporary_room))
        .route("/api/rooms/public", post(rooms::create_public_room))
        .route("/api/rooms/{id}", get(rooms::room_info).delete(rooms::delete_room))
        .route("/api/rooms/{id}/heartbeat", post(rooms::heartbeat))
        .route(
            "/api/rooms/{id}/messages",
            get(messages::poll_messages).post(messages::send_message),
        )
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
