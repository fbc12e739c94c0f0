//! Liveness rules for every entity kind.
//!
//! All predicates are pure and take `now` explicitly. Timestamps are epoch
//! milliseconds, as stored.

use std::time::Duration;

use anyhow::bail;

use crate::models::RoomRow;
use wisp_types::models::RoomKind;

/// Which grace window a liveness check applies to a temporary room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grace {
    /// Short window, enforced when a client polls, sends or heartbeats.
    Poll,
    /// Long window, enforced by the background sweep.
    Sweep,
}

/// Tunable lifetimes shared by all stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifetimes {
    pub poll_grace: Duration,
    pub sweep_grace: Duration,
    pub message_ttl: Duration,
    /// How long a public room stays listed and survives the sweep.
    pub public_room_window: Duration,
}

impl Default for Lifetimes {
    fn default() -> Self {
        Self {
            poll_grace: Duration::from_secs(8),
            sweep_grace: Duration::from_secs(600),
            message_ttl: Duration::from_secs(300),
            public_room_window: Duration::from_secs(24 * 3600),
        }
    }
}

impl Lifetimes {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_grace.is_zero()
            || self.sweep_grace.is_zero()
            || self.message_ttl.is_zero()
            || self.public_room_window.is_zero()
        {
            bail!("lifetimes must be non-zero");
        }
        if self.poll_grace > self.sweep_grace {
            bail!(
                "poll grace ({}s) must not exceed sweep grace ({}s)",
                self.poll_grace.as_secs(),
                self.sweep_grace.as_secs()
            );
        }
        Ok(())
    }

    pub fn grace(&self, grace: Grace) -> Duration {
        match grace {
            Grace::Poll => self.poll_grace,
            Grace::Sweep => self.sweep_grace,
        }
    }

    /// A note is dead strictly after its expiry instant.
    pub fn secret_expired(&self, expire_at: i64, now: i64) -> bool {
        now > expire_at
    }

    /// Public rooms never lapse; temporary ones do once the owner goes quiet.
    pub fn room_lapsed(&self, room: &RoomRow, now: i64, grace: Grace) -> bool {
        match room.kind {
            RoomKind::Public => false,
            RoomKind::Temporary => now - room.last_active > as_millis(self.grace(grace)),
        }
    }

    /// Oldest `created_at` a message may have and still be served at `now`.
    pub fn message_cutoff(&self, now: i64) -> i64 {
        now - as_millis(self.message_ttl)
    }

    /// Oldest `last_active` a temporary room may have and still be alive.
    pub fn heartbeat_cutoff(&self, now: i64, grace: Grace) -> i64 {
        now - as_millis(self.grace(grace))
    }

    pub fn public_room_cutoff(&self, now: i64) -> i64 {
        now - as_millis(self.public_room_window)
    }
}

fn as_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_room(last_active: i64) -> RoomRow {
        RoomRow {
            id: "r".into(),
            kind: RoomKind::Temporary,
            name: None,
            salt: None,
            owner_token: Some("t".into()),
            created_at: 0,
            last_active,
        }
    }

    #[test]
    fn secret_expires_strictly_after_deadline() {
        let l = Lifetimes::default();
        assert!(!l.secret_expired(1_000, 1_000));
        assert!(l.secret_expired(1_000, 1_001));
    }

    #[test]
    fn temporary_room_grace_windows() {
        let l = Lifetimes::default();
        let room = temp_room(0);

        assert!(!l.room_lapsed(&room, 8_000, Grace::Poll));
        assert!(l.room_lapsed(&room, 8_001, Grace::Poll));
        assert!(!l.room_lapsed(&room, 8_001, Grace::Sweep));
        assert!(l.room_lapsed(&room, 600_001, Grace::Sweep));
    }

    #[test]
    fn public_rooms_never_lapse() {
        let l = Lifetimes::default();
        let mut room = temp_room(0);
        room.kind = RoomKind::Public;
        assert!(!l.room_lapsed(&room, i64::MAX / 2, Grace::Sweep));
    }

    #[test]
    fn cutoffs_follow_lifetimes() {
        let l = Lifetimes::default();
        let now = 100_000_000;
        assert_eq!(l.message_cutoff(now), now - 300_000);
        assert_eq!(l.heartbeat_cutoff(now, Grace::Poll), now - 8_000);
        assert_eq!(l.heartbeat_cutoff(now, Grace::Sweep), now - 600_000);
        assert_eq!(l.public_room_cutoff(now), now - 86_400_000);
    }

    #[test]
    fn validate_rejects_inverted_graces() {
        let mut l = Lifetimes::default();
        assert!(l.validate().is_ok());

        l.poll_grace = Duration::from_secs(700);
        assert!(l.validate().is_err());

        l.poll_grace = Duration::ZERO;
        assert!(l.validate().is_err());
    }
}
