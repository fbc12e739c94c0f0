use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use wisp_db::secrets::NewSecret;
use wisp_types::api::{CreateNoteRequest, CreateNoteResponse, NoteMetadata, NotePayload};

use crate::client::ClientId;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::rate_limit::{Action, throttle};
use crate::reaper;
use crate::state::{AppState, blocking};

/// POST /api/notes: store an encrypted note and return its id.
pub async fn create_note(
    State(state): State<AppState>,
    client: ClientId,
    JsonBody(req): JsonBody<CreateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    throttle(&state.limiter, &client, Action::CreateNote)?;

    let id = blocking(&state, move |s| {
        let now = Utc::now();
        let id = s.db.create_secret(
            &NewSecret {
                ciphertext: &req.ciphertext,
                iv: &req.iv,
                salt: req.salt.as_deref(),
                ttl_hours: req.expire_hours,
                burn_mode: req.burn_mode,
            },
            now,
        )?;
        reaper::sweep_quietly(s, now);
        Ok(id)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(CreateNoteResponse { id })))
}

/// POST /api/notes/{id}/read: return the payload, burning the note if asked to.
pub async fn read_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NotePayload>, ApiError> {
    let row = blocking(&state, move |s| {
        let now = Utc::now();
        let result = s.db.read_secret(&id, now);
        reaper::maybe_sweep(s, now);
        result
    })
    .await?;

    Ok(Json(NotePayload {
        ciphertext: row.ciphertext,
        iv: row.iv,
        salt: row.salt,
    }))
}

/// GET /api/notes/{id}: what the confirmation page needs, without consuming.
pub async fn note_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NoteMetadata>, ApiError> {
    let meta = blocking(&state, move |s| {
        let now = Utc::now();
        let result = s.db.secret_metadata(&id, now);
        reaper::maybe_sweep(s, now);
        result
    })
    .await?;

    Ok(Json(NoteMetadata {
        has_password: meta.has_password,
        burn_mode: meta.burn_mode,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::{app, call};

    #[tokio::test]
    async fn note_is_burned_after_first_read() {
        let app = app();
        let (status, body) = call(
            &app,
            "POST",
            "/api/notes",
            "10.0.0.1",
            Some(json!({ "ciphertext": "c2VjcmV0", "iv": "aXY=", "expire_hours": 1, "burn_mode": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();

        let (status, meta) = call(&app, "GET", &format!("/api/notes/{id}"), "10.0.0.2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(meta, json!({ "has_password": false, "burn_mode": 1 }));

        let read = format!("/api/notes/{id}/read");
        let (status, payload) = call(&app, "POST", &read, "10.0.0.2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload, json!({ "ciphertext": "c2VjcmV0", "iv": "aXY=", "salt": null }));

        let (status, body) = call(&app, "POST", &read, "10.0.0.2", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not found");
    }

    #[tokio::test]
    async fn invalid_notes_are_rejected() {
        let app = app();

        let (status, _) = call(
            &app,
            "POST",
            "/api/notes",
            "10.0.0.1",
            Some(json!({ "ciphertext": "YQ==", "iv": "aXY=", "expire_hours": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            "POST",
            "/api/notes",
            "10.0.0.2",
            Some(json!({ "ciphertext": "A".repeat(20_004), "iv": "aXY=" })),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn malformed_bodies_get_json_errors() {
        let app = app();

        for body in [
            json!({ "ciphertext": "YQ==", "iv": "aXY=", "burn_mode": 2 }),
            json!({ "ciphertext": "YQ==", "iv": "aXY=", "expire_hours": "24" }),
            json!({ "ciphertext": "YQ==", "iv": "aXY=", "colour": "red" }),
            json!({ "iv": "aXY=" }),
        ] {
            let (status, err) = call(&app, "POST", "/api/notes", "10.0.0.1", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(err["error"].as_str().is_some_and(|msg| !msg.is_empty()));
        }
    }

    #[tokio::test]
    async fn note_creation_is_throttled_per_client() {
        let app = app();
        let note = json!({ "ciphertext": "YQ==", "iv": "aXY=" });

        let (status, _) = call(&app, "POST", "/api/notes", "10.0.0.9", Some(note.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = call(&app, "POST", "/api/notes", "10.0.0.9", Some(note.clone())).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        let (status, _) = call(&app, "POST", "/api/notes", "10.0.0.10", Some(note)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn unknown_note_is_not_found() {
        let app = app();
        let (status, _) = call(&app, "GET", "/api/notes/deadbeef", "10.0.0.1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
