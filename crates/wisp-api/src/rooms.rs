use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::warn;
use wisp_db::StoreError;
use wisp_db::rooms::RoomAuthority;
use wisp_types::api::{
    CreatePublicRoomRequest, CreatePublicRoomResponse, DeleteRoomRequest, HeartbeatRequest,
    OkResponse, PublicRoomSummary, RoomInfoResponse, TemporaryRoomResponse,
};

use crate::client::ClientId;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::rate_limit::{Action, throttle};
use crate::reaper;
use crate::state::{AppState, blocking};

/// POST /api/rooms/temporary: anyone may open one, once per cooldown.
pub async fn create_temporary_room(
    State(state): State<AppState>,
    client: ClientId,
) -> Result<impl IntoResponse, ApiError> {
    throttle(&state.limiter, &client, Action::CreateTempRoom)?;

    let room = blocking(&state, |s| {
        let now = Utc::now();
        let room = s.db.create_temporary_room(now)?;
        reaper::sweep_quietly(s, now);
        Ok(room)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(TemporaryRoomResponse {
            id: room.id,
            owner_token: room.owner_token,
        }),
    ))
}

/// POST /api/rooms/public: admin only. Throttled before the credential is
/// checked so it cannot be guessed quickly.
pub async fn create_public_room(
    State(state): State<AppState>,
    client: ClientId,
    JsonBody(req): JsonBody<CreatePublicRoomRequest>,
) -> Result<impl IntoResponse, ApiError> {
    throttle(&state.limiter, &client, Action::AdminAction)?;

    if !state.admin.verify(&req.admin_password) {
        warn!("Rejected public room creation from {}", client.as_str());
        return Err(StoreError::Forbidden.into());
    }

    let id = blocking(&state, move |s| {
        let now = Utc::now();
        let id = s.db.create_public_room(&req.name, &req.salt, now)?;
        reaper::sweep_quietly(s, now);
        Ok(id)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(CreatePublicRoomResponse { id })))
}

/// GET /api/rooms: public rooms created within the listing window.
pub async fn list_rooms(State(state): State<AppState>) -> Result<Json<Vec<PublicRoomSummary>>, ApiError> {
    let rows = blocking(&state, |s| {
        let now = Utc::now();
        let result = s.db.list_public_rooms(now);
        reaper::maybe_sweep(s, now);
        result
    })
    .await?;

    let rooms = rows
        .into_iter()
        .map(|row| PublicRoomSummary {
            id: row.id,
            name: row.name.unwrap_or_default(),
            created_at: row.created_at,
            salt: row.salt.unwrap_or_default(),
        })
        .collect();

    Ok(Json(rooms))
}

/// GET /api/rooms/{id}: the KDF salt for joiners who only know the password.
pub async fn room_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RoomInfoResponse>, ApiError> {
    let info = blocking(&state, move |s| {
        let now = Utc::now();
        let result = s.db.room_info(&id, now);
        reaper::maybe_sweep(s, now);
        result
    })
    .await?;

    Ok(Json(RoomInfoResponse { salt: info.salt }))
}

/// POST /api/rooms/{id}/heartbeat: owner keeps a temporary room alive.
pub async fn heartbeat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<HeartbeatRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    blocking(&state, move |s| {
        let now = Utc::now();
        let result = s.db.heartbeat(&id, &req.owner_token, now);
        reaper::maybe_sweep(s, now);
        result
    })
    .await?;

    Ok(Json(OkResponse::ok()))
}

/// DELETE /api/rooms/{id}: by the owner token, or by the admin credential.
pub async fn delete_room(
    State(state): State<AppState>,
    client: ClientId,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<DeleteRoomRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    // `None` once the admin credential has been verified.
    let owner_token = match (req.owner_token, req.admin_password) {
        (Some(token), _) => Some(token),
        (None, Some(password)) => {
            throttle(&state.limiter, &client, Action::AdminAction)?;
            if !state.admin.verify(&password) {
                warn!("Rejected admin room delete from {}", client.as_str());
                return Err(StoreError::Forbidden.into());
            }
            None
        }
        (None, None) => return Err(StoreError::Forbidden.into()),
    };

    blocking(&state, move |s| {
        let authority = match &owner_token {
            Some(token) => RoomAuthority::Owner(token),
            None => RoomAuthority::Admin,
        };
        s.db.delete_room(&id, authority)?;
        reaper::sweep_quietly(s, Utc::now());
        Ok(())
    })
    .await?;

    Ok(Json(OkResponse::ok()))
}
