use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::expiry::Grace;
use crate::models::SweepReport;
use crate::{Database, StoreError, millis};

impl Database {
    /// Remove everything that is past its lifetime at `now`.
    ///
    /// Expired notes, temporary rooms silent for longer than the sweep grace,
    /// public rooms past their listing window, messages past the rolling
    /// window, and messages whose room no longer exists. Safe to run
    /// concurrently with itself and with every other operation.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
        let now = millis(now);
        let lifetimes = *self.lifetimes();

        self.with_tx(|tx| {
            let secrets = tx.execute("DELETE FROM secrets WHERE expire_at < ?1", [now])?;

            let rooms = tx.execute(
                "DELETE FROM rooms
                 WHERE (kind = 'temporary' AND last_active < ?1)
                    OR (kind = 'public' AND created_at < ?2)",
                params![
                    lifetimes.heartbeat_cutoff(now, Grace::Sweep),
                    lifetimes.public_room_cutoff(now),
                ],
            )?;

            let messages = tx.execute(
                "DELETE FROM messages
                 WHERE created_at < ?1
                    OR room_id NOT IN (SELECT id FROM rooms)",
                [lifetimes.message_cutoff(now)],
            )?;

            Ok(SweepReport {
                secrets,
                messages,
                rooms,
            })
        })
    }
}
