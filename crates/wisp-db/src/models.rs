//! Database row types. These map directly to SQLite rows.
//! Distinct from wisp-types API models to keep the DB layer independent.

use rusqlite::Row;
use rusqlite::types::Type;
use wisp_types::models::{BurnMode, RoomKind};

#[derive(Debug, Clone)]
pub struct SecretRow {
    pub id: String,
    pub ciphertext: String,
    pub iv: String,
    pub salt: Option<String>,
    pub burn_mode: BurnMode,
    pub created_at: i64,
    pub expire_at: i64,
}

impl SecretRow {
    pub(crate) const COLUMNS: &'static str =
        "id, ciphertext, iv, salt, burn_on_read, created_at, expire_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let burn_on_read: bool = row.get(4)?;
        Ok(Self {
            id: row.get(0)?,
            ciphertext: row.get(1)?,
            iv: row.get(2)?,
            salt: row.get(3)?,
            burn_mode: if burn_on_read {
                BurnMode::BurnOnRead
            } else {
                BurnMode::PersistUntilExpiry
            },
            created_at: row.get(5)?,
            expire_at: row.get(6)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RoomRow {
    pub id: String,
    pub kind: RoomKind,
    pub name: Option<String>,
    pub salt: Option<String>,
    pub owner_token: Option<String>,
    pub created_at: i64,
    pub last_active: i64,
}

impl RoomRow {
    pub(crate) const COLUMNS: &'static str =
        "id, kind, name, salt, owner_token, created_at, last_active";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let kind: String = row.get(1)?;
        let kind = RoomKind::parse(&kind).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                Type::Text,
                format!("unknown room kind '{kind}'").into(),
            )
        })?;

        Ok(Self {
            id: row.get(0)?,
            kind,
            name: row.get(2)?,
            salt: row.get(3)?,
            owner_token: row.get(4)?,
            created_at: row.get(5)?,
            last_active: row.get(6)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub room_id: String,
    pub ciphertext: String,
    pub iv: String,
    pub sender_id: String,
    pub created_at: i64,
}

/// Freshly created temporary room; the token is only ever handed out here.
#[derive(Debug, Clone)]
pub struct NewTemporaryRoom {
    pub id: String,
    pub owner_token: String,
}

/// Rows removed by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub secrets: usize,
    pub messages: usize,
    pub rooms: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.secrets == 0 && self.messages == 0 && self.rooms == 0
    }
}

/// What a joiner may learn about a room before entering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub kind: RoomKind,
    pub salt: Option<String>,
}
