use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;
use wisp_types::models::RoomKind;

use crate::expiry::{Grace, Lifetimes};
use crate::models::{NewTemporaryRoom, RoomInfo, RoomRow};
use crate::validate;
use crate::{Database, StoreError, millis, new_id, new_token};

/// Who is asking to delete a room.
#[derive(Debug, Clone, Copy)]
pub enum RoomAuthority<'a> {
    /// The admin credential was already verified by the caller.
    Admin,
    /// Capability token handed out when the temporary room was created.
    Owner(&'a str),
}

impl Database {
    pub fn create_temporary_room(&self, now: DateTime<Utc>) -> Result<NewTemporaryRoom, StoreError> {
        let room = NewTemporaryRoom {
            id: new_id(),
            owner_token: new_token(),
        };
        let now = millis(now);

        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO rooms (id, kind, owner_token, created_at, last_active)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![room.id, RoomKind::Temporary.as_str(), room.owner_token, now],
            )?;
            Ok(())
        })?;

        Ok(room)
    }

    /// Insert a listed room. The admin credential is checked by the caller.
    pub fn create_public_room(&self, name: &str, salt: &str, now: DateTime<Utc>) -> Result<String, StoreError> {
        let name = validate::room_name(name)?;
        validate::salt(salt)?;

        let id = new_id();
        let now = millis(now);

        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO rooms (id, kind, name, salt, created_at, last_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![id, RoomKind::Public.as_str(), name, salt, now],
            )?;
            Ok(())
        })?;

        Ok(id)
    }

    /// Refresh a temporary room's liveness.
    ///
    /// A wrong token, an unknown room, a public room and an already lapsed
    /// room all produce the same `Forbidden`.
    pub fn heartbeat(&self, id: &str, owner_token: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        let now = millis(now);
        let cutoff = self.lifetimes().heartbeat_cutoff(now, Grace::Poll);

        let updated = self.with_tx(|tx| {
            Ok(tx.execute(
                "UPDATE rooms SET last_active = MAX(last_active, ?1)
                 WHERE id = ?2 AND kind = 'temporary' AND owner_token = ?3 AND last_active >= ?4",
                params![now, id, owner_token, cutoff],
            )?)
        })?;

        if updated == 0 {
            return Err(StoreError::Forbidden);
        }
        Ok(())
    }

    pub fn room_info(&self, id: &str, now: DateTime<Utc>) -> Result<RoomInfo, StoreError> {
        let now = millis(now);
        let lifetimes = *self.lifetimes();

        let room = self
            .with_conn(|conn| load_room(conn, id))?
            .filter(|room| !lifetimes.room_lapsed(room, now, Grace::Poll))
            .ok_or(StoreError::NotFound)?;

        Ok(RoomInfo {
            kind: room.kind,
            salt: room.salt,
        })
    }

    /// Delete a room and every message in it.
    pub fn delete_room(&self, id: &str, authority: RoomAuthority<'_>) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            let removed = match authority {
                RoomAuthority::Admin => tx.execute("DELETE FROM rooms WHERE id = ?1", [id])?,
                RoomAuthority::Owner(token) => {
                    let removed = tx.execute(
                        "DELETE FROM rooms WHERE id = ?1 AND kind = 'temporary' AND owner_token = ?2",
                        params![id, token],
                    )?;
                    if removed == 0 {
                        return Err(StoreError::Forbidden);
                    }
                    removed
                }
            };

            let messages = tx.execute("DELETE FROM messages WHERE room_id = ?1", [id])?;
            debug!("Deleted room ({} rows, {} messages)", removed, messages);
            Ok(())
        })
    }

    /// Public rooms still inside their listing window, newest first.
    pub fn list_public_rooms(&self, now: DateTime<Utc>) -> Result<Vec<RoomRow>, StoreError> {
        let cutoff = self.lifetimes().public_room_cutoff(millis(now));

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM rooms
                 WHERE kind = 'public' AND created_at >= ?1
                 ORDER BY created_at DESC, id DESC",
                RoomRow::COLUMNS
            ))?;

            let rows = stmt
                .query_map([cutoff], RoomRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

pub(crate) fn load_room(conn: &Connection, id: &str) -> Result<Option<RoomRow>, StoreError> {
    let room = conn
        .query_row(
            &format!("SELECT {} FROM rooms WHERE id = ?1", RoomRow::COLUMNS),
            [id],
            RoomRow::from_row,
        )
        .optional()?;
    Ok(room)
}

/// Load a room for a poll or send, destroying it on the spot if its owner
/// stopped heartbeating. `None` means the room is gone.
pub(crate) fn live_room(
    conn: &Connection,
    lifetimes: &Lifetimes,
    id: &str,
    now: i64,
) -> Result<Option<RoomRow>, StoreError> {
    let Some(room) = load_room(conn, id)? else {
        return Ok(None);
    };

    if lifetimes.room_lapsed(&room, now, Grace::Poll) {
        conn.execute("DELETE FROM rooms WHERE id = ?1", [id])?;
        conn.execute("DELETE FROM messages WHERE room_id = ?1", [id])?;
        debug!("Temporary room lapsed, destroyed");
        return Ok(None);
    }

    Ok(Some(room))
}
