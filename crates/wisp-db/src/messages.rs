use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::models::MessageRow;
use crate::rooms::live_room;
use crate::validate::{self, MAX_MESSAGE_CHARS};
use crate::{Database, StoreError, millis};

#[derive(Debug, Clone, Copy)]
pub struct NewMessage<'a> {
    pub ciphertext: &'a str,
    pub iv: &'a str,
    pub sender_id: &'a str,
}

impl Database {
    /// Append a message to a live room and return its `created_at`.
    ///
    /// Timestamps are strictly increasing within a room, so a client cursor
    /// on `created_at` can neither skip nor repeat a message.
    pub fn send_message(
        &self,
        room_id: &str,
        msg: &NewMessage<'_>,
        now: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        validate::ciphertext(msg.ciphertext, MAX_MESSAGE_CHARS)?;
        validate::iv(msg.iv)?;
        validate::sender_id(msg.sender_id)?;

        let now = millis(now);
        let lifetimes = *self.lifetimes();

        let created_at = self.with_tx(|tx| {
            if live_room(tx, &lifetimes, room_id, now)?.is_none() {
                return Ok(None);
            }

            let last: Option<i64> = tx.query_row(
                "SELECT MAX(created_at) FROM messages WHERE room_id = ?1",
                [room_id],
                |r| r.get(0),
            )?;
            let created_at = last.map_or(now, |last| now.max(last + 1));

            tx.execute(
                "INSERT INTO messages (room_id, ciphertext, iv, sender_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![room_id, msg.ciphertext, msg.iv, msg.sender_id, created_at],
            )?;
            Ok(Some(created_at))
        })?;

        created_at.ok_or(StoreError::RoomGone)
    }

    /// Messages newer than `since`, oldest first.
    ///
    /// Polling is also where a silent temporary room gets destroyed, and where
    /// the room's messages past the rolling window are trimmed.
    pub fn poll_messages(
        &self,
        room_id: &str,
        since: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<MessageRow>, StoreError> {
        let now = millis(now);
        let lifetimes = *self.lifetimes();
        let cutoff = lifetimes.message_cutoff(now);

        let messages = self.with_tx(|tx| {
            if live_room(tx, &lifetimes, room_id, now)?.is_none() {
                return Ok(None);
            }

            tx.execute(
                "DELETE FROM messages WHERE room_id = ?1 AND created_at < ?2",
                params![room_id, cutoff],
            )?;

            let mut stmt = tx.prepare(
                "SELECT id, room_id, ciphertext, iv, sender_id, created_at
                 FROM messages
                 WHERE room_id = ?1 AND created_at > ?2
                 ORDER BY created_at ASC, id ASC",
            )?;
            let rows = stmt
                .query_map(params![room_id, since], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        room_id: row.get(1)?,
                        ciphertext: row.get(2)?,
                        iv: row.get(3)?,
                        sender_id: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Some(rows))
        })?;

        messages.ok_or(StoreError::RoomGone)
    }
}
