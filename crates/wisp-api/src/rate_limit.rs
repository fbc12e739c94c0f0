//! Per-client cooldown gate.
//!
//! State lives only in this process; a restart forgets every limit.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::client::ClientId;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreateNote,
    CreateTempRoom,
    /// Public-room creation and admin deletes; throttles credential guessing.
    AdminAction,
    SendMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldowns {
    pub create_note: Duration,
    pub create_temp_room: Duration,
    pub admin_action: Duration,
    pub send_message: Duration,
}

impl Default for Cooldowns {
    fn default() -> Self {
        Self {
            create_note: Duration::from_secs(2),
            create_temp_room: Duration::from_secs(60),
            admin_action: Duration::from_secs(3),
            send_message: Duration::from_secs(1),
        }
    }
}

impl Cooldowns {
    pub fn get(&self, action: Action) -> Duration {
        match action {
            Action::CreateNote => self.create_note,
            Action::CreateTempRoom => self.create_temp_room,
            Action::AdminAction => self.admin_action,
            Action::SendMessage => self.send_message,
        }
    }
}

/// Remembers when each `(client, action)` pair was last let through.
pub struct RateLimiter {
    cooldowns: Cooldowns,
    last_accepted: Mutex<HashMap<(String, Action), Instant>>,
}

impl RateLimiter {
    pub fn new(cooldowns: Cooldowns) -> Self {
        Self {
            cooldowns,
            last_accepted: Mutex::new(HashMap::new()),
        }
    }

    pub fn try_acquire(&self, client: &str, action: Action) -> bool {
        self.try_acquire_at(client, action, Instant::now())
    }

    /// Accept iff the cooldown has elapsed since the last *accepted* attempt.
    /// Rejected attempts leave the stored instant untouched.
    pub fn try_acquire_at(&self, client: &str, action: Action, now: Instant) -> bool {
        let cooldown = self.cooldowns.get(action);
        let mut map = self.lock();

        match map.entry((client.to_owned(), action)) {
            Entry::Occupied(mut entry) => {
                if now.saturating_duration_since(*entry.get()) >= cooldown {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Drop entries whose cooldown has run out. Returns how many were removed.
    pub fn evict_stale(&self, now: Instant) -> usize {
        let mut map = self.lock();
        let before = map.len();
        map.retain(|(_, action), last| now.saturating_duration_since(*last) < self.cooldowns.get(*action));
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave the map inconsistent.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, Action), Instant>> {
        self.last_accepted.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) fn throttle(limiter: &RateLimiter, client: &ClientId, action: Action) -> Result<(), ApiError> {
    if limiter.try_acquire(client.as_str(), action) {
        Ok(())
    } else {
        debug!("Rate limited {:?} for {}", action, client.as_str());
        Err(ApiError::RateLimited)
    }
}
