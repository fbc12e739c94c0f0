use serde::{Deserialize, Serialize};

use crate::models::BurnMode;

// All ciphertext, iv and salt fields are base64 strings produced by the
// browser. The server stores and returns them verbatim.

// -- Notes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateNoteRequest {
    pub ciphertext: String,
    pub iv: String,
    #[serde(default)]
    pub salt: Option<String>,
    #[serde(default = "default_expire_hours")]
    pub expire_hours: u32,
    #[serde(default)]
    pub burn_mode: BurnMode,
}

fn default_expire_hours() -> u32 {
    24
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateNoteResponse {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotePayload {
    pub ciphertext: String,
    pub iv: String,
    pub salt: Option<String>,
}

/// Shown on the confirmation page before the reader consumes a note.
#[derive(Debug, Serialize, Deserialize)]
pub struct NoteMetadata {
    pub has_password: bool,
    pub burn_mode: BurnMode,
}

// -- Rooms --

#[derive(Debug, Serialize, Deserialize)]
pub struct TemporaryRoomResponse {
    pub id: String,
    pub owner_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePublicRoomRequest {
    pub name: String,
    pub salt: String,
    pub admin_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePublicRoomResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeartbeatRequest {
    pub owner_token: String,
}

/// Either credential may authorise a delete; the owner token is tried first.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteRoomRequest {
    #[serde(default)]
    pub owner_token: Option<String>,
    #[serde(default)]
    pub admin_password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomInfoResponse {
    pub salt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublicRoomSummary {
    pub id: String,
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub salt: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub ciphertext: String,
    pub iv: String,
    pub sender_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    /// Largest `created_at` the client has already seen.
    #[serde(default)]
    pub since: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub ciphertext: String,
    pub iv: String,
    pub created_at: i64,
    pub sender_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PollResponse {
    Messages(Vec<ChatMessage>),
    Gone { status: RoomStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    RoomGone,
}

// -- Misc --

#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
