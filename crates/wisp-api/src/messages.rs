use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use wisp_db::StoreError;
use wisp_db::messages::NewMessage;
use wisp_types::api::{ChatMessage, OkResponse, PollQuery, PollResponse, RoomStatus, SendMessageRequest};

use crate::client::ClientId;
use crate::error::ApiError;
use crate::extract::{JsonBody, QueryParams};
use crate::rate_limit::{Action, throttle};
use crate::reaper;
use crate::state::{AppState, blocking};

/// POST /api/rooms/{id}/messages
pub async fn send_message(
    State(state): State<AppState>,
    client: ClientId,
    Path(room_id): Path<String>,
    JsonBody(req): JsonBody<SendMessageRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    throttle(&state.limiter, &client, Action::SendMessage)?;

    blocking(&state, move |s| {
        let now = Utc::now();
        s.db.send_message(
            &room_id,
            &NewMessage {
                ciphertext: &req.ciphertext,
                iv: &req.iv,
                sender_id: &req.sender_id,
            },
            now,
        )?;
        reaper::sweep_quietly(s, now);
        Ok(())
    })
    .await?;

    Ok(Json(OkResponse::ok()))
}

/// GET /api/rooms/{id}/messages?since=<ms>
///
/// A vanished room is a normal outcome for a poller, so it is reported in
/// the body rather than as an error status.
pub async fn poll_messages(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    QueryParams(query): QueryParams<PollQuery>,
) -> Result<Json<PollResponse>, ApiError> {
    let polled = blocking(&state, move |s| {
        let now = Utc::now();
        let result = match s.db.poll_messages(&room_id, query.since, now) {
            Ok(rows) => Ok(Some(rows)),
            Err(StoreError::RoomGone) => Ok(None),
            Err(e) => Err(e),
        };
        reaper::maybe_sweep(s, now);
        result
    })
    .await?;

    let Some(rows) = polled else {
        return Ok(Json(PollResponse::Gone {
            status: RoomStatus::RoomGone,
        }));
    };

    let messages = rows
        .into_iter()
        .map(|row| ChatMessage {
            ciphertext: row.ciphertext,
            iv: row.iv,
            created_at: row.created_at,
            sender_id: row.sender_id,
        })
        .collect();

    Ok(Json(PollResponse::Messages(messages)))
}
