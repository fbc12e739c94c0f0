use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use wisp_types::models::BurnMode;

use crate::models::SecretRow;
use crate::validate::{self, MAX_NOTE_CHARS};
use crate::{Database, StoreError, millis, new_id};

const HOUR_MS: i64 = 3_600_000;

/// Input for [`Database::create_secret`].
#[derive(Debug, Clone, Copy)]
pub struct NewSecret<'a> {
    pub ciphertext: &'a str,
    pub iv: &'a str,
    pub salt: Option<&'a str>,
    pub ttl_hours: u32,
    pub burn_mode: BurnMode,
}

/// What the confirmation page needs to know without consuming the note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretMetadata {
    pub has_password: bool,
    pub burn_mode: BurnMode,
}

enum Lookup<T> {
    Live(T),
    Expired,
    Missing,
}

impl<T> Lookup<T> {
    fn into_result(self) -> Result<T, StoreError> {
        match self {
            Self::Live(value) => Ok(value),
            Self::Expired => Err(StoreError::Expired),
            Self::Missing => Err(StoreError::NotFound),
        }
    }
}

impl Database {
    pub fn create_secret(&self, new: &NewSecret<'_>, now: DateTime<Utc>) -> Result<String, StoreError> {
        validate::ciphertext(new.ciphertext, MAX_NOTE_CHARS)?;
        validate::iv(new.iv)?;
        if let Some(salt) = new.salt {
            validate::salt(salt)?;
        }
        validate::ttl_hours(new.ttl_hours)?;

        let id = new_id();
        let created_at = millis(now);
        let expire_at = created_at + i64::from(new.ttl_hours) * HOUR_MS;

        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO secrets (id, ciphertext, iv, salt, burn_on_read, created_at, expire_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    new.ciphertext,
                    new.iv,
                    new.salt,
                    new.burn_mode.burns_on_read(),
                    created_at,
                    expire_at,
                ],
            )?;
            Ok(())
        })?;

        Ok(id)
    }

    /// Fetch a note, consuming it if it burns on read.
    ///
    /// The conditional delete and the fetch are one statement, so among
    /// concurrent readers of a burn-on-read note exactly one gets the row back.
    /// Expired notes are deleted on sight and reported as `Expired`.
    pub fn read_secret(&self, id: &str, now: DateTime<Utc>) -> Result<SecretRow, StoreError> {
        let now = millis(now);
        let lifetimes = *self.lifetimes();

        let lookup = self.with_tx(|tx| {
            let removed = tx
                .query_row(
                    &format!(
                        "DELETE FROM secrets
                         WHERE id = ?1 AND (burn_on_read = 1 OR expire_at < ?2)
                         RETURNING {}",
                        SecretRow::COLUMNS
                    ),
                    params![id, now],
                    SecretRow::from_row,
                )
                .optional()?;

            if let Some(row) = removed {
                if lifetimes.secret_expired(row.expire_at, now) {
                    return Ok(Lookup::Expired);
                }
                return Ok(Lookup::Live(row));
            }

            // Only live persistent notes can still be here.
            let kept = tx
                .query_row(
                    &format!("SELECT {} FROM secrets WHERE id = ?1", SecretRow::COLUMNS),
                    [id],
                    SecretRow::from_row,
                )
                .optional()?;

            Ok(match kept {
                Some(row) => Lookup::Live(row),
                None => Lookup::Missing,
            })
        })?;

        lookup.into_result()
    }

    pub fn secret_metadata(&self, id: &str, now: DateTime<Utc>) -> Result<SecretMetadata, StoreError> {
        let now = millis(now);

        let lookup = self.with_tx(|tx| {
            let purged = tx.execute(
                "DELETE FROM secrets WHERE id = ?1 AND expire_at < ?2",
                params![id, now],
            )?;
            if purged > 0 {
                return Ok(Lookup::Expired);
            }

            let meta = tx
                .query_row(
                    "SELECT salt IS NOT NULL, burn_on_read FROM secrets WHERE id = ?1",
                    [id],
                    |row| {
                        let burn_on_read: bool = row.get(1)?;
                        Ok(SecretMetadata {
                            has_password: row.get(0)?,
                            burn_mode: if burn_on_read {
                                BurnMode::BurnOnRead
                            } else {
                                BurnMode::PersistUntilExpiry
                            },
                        })
                    },
                )
                .optional()?;

            Ok(meta.map_or(Lookup::Missing, Lookup::Live))
        })?;

        lookup.into_result()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use chrono::Duration;

    use super::*;
    use crate::test_support::{count, db, t0};

    fn note<'a>(burn_mode: BurnMode) -> NewSecret<'a> {
        NewSecret {
            ciphertext: "c2VjcmV0",
            iv: "aXZpdml2aXZpdml2",
            salt: None,
            ttl_hours: 1,
            burn_mode,
        }
    }

    #[test]
    fn burn_on_read_returns_payload_once() {
        let db = db();
        let id = db.create_secret(&note(BurnMode::BurnOnRead), t0()).unwrap();

        let row = db.read_secret(&id, t0()).unwrap();
        assert_eq!(row.ciphertext, "c2VjcmV0");
        assert!(row.salt.is_none());

        assert!(matches!(db.read_secret(&id, t0()), Err(StoreError::NotFound)));
        assert_eq!(count(&db, "secrets"), 0);
    }

    #[test]
    fn persistent_note_survives_reads_until_expiry() {
        let db = db();
        let id = db.create_secret(&note(BurnMode::PersistUntilExpiry), t0()).unwrap();

        for _ in 0..3 {
            assert!(db.read_secret(&id, t0() + Duration::minutes(30)).is_ok());
        }

        let late = t0() + Duration::hours(1) + Duration::milliseconds(1);
        assert!(matches!(db.read_secret(&id, late), Err(StoreError::Expired)));
        assert!(matches!(db.read_secret(&id, late), Err(StoreError::NotFound)));
    }

    #[test]
    fn no_mode_returns_content_after_expiry() {
        let db = db();
        for mode in [BurnMode::BurnOnRead, BurnMode::PersistUntilExpiry] {
            let id = db.create_secret(&note(mode), t0()).unwrap();
            let late = t0() + Duration::hours(2);
            assert!(matches!(db.read_secret(&id, late), Err(StoreError::Expired)));
        }
        assert_eq!(count(&db, "secrets"), 0);
    }

    #[test]
    fn readable_exactly_at_deadline() {
        let db = db();
        let id = db.create_secret(&note(BurnMode::BurnOnRead), t0()).unwrap();
        assert!(db.read_secret(&id, t0() + Duration::hours(1)).is_ok());
    }

    #[test]
    fn concurrent_reads_consume_once() {
        let db = Arc::new(db());
        let id = db.create_secret(&note(BurnMode::BurnOnRead), t0()).unwrap();

        let readers = 8;
        let barrier = Arc::new(Barrier::new(readers));
        let handles: Vec<_> = (0..readers)
            .map(|_| {
                let db = db.clone();
                let id = id.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    db.read_secret(&id, t0())
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let misses = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::NotFound)))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(misses, readers - 1);
    }

    #[test]
    fn metadata_does_not_consume() {
        let db = db();
        let mut new = note(BurnMode::BurnOnRead);
        new.salt = Some("c2FsdHNhbHQ=");
        let id = db.create_secret(&new, t0()).unwrap();

        let meta = db.secret_metadata(&id, t0()).unwrap();
        assert!(meta.has_password);
        assert_eq!(meta.burn_mode, BurnMode::BurnOnRead);

        assert!(db.read_secret(&id, t0()).is_ok());
        assert!(matches!(db.secret_metadata(&id, t0()), Err(StoreError::NotFound)));
    }

    #[test]
    fn metadata_purges_expired_note() {
        let db = db();
        let id = db.create_secret(&note(BurnMode::PersistUntilExpiry), t0()).unwrap();

        let late = t0() + Duration::days(1);
        assert!(matches!(db.secret_metadata(&id, late), Err(StoreError::Expired)));
        assert_eq!(count(&db, "secrets"), 0);
    }

    #[test]
    fn create_validates_input() {
        let db = db();

        let mut bad_ttl = note(BurnMode::BurnOnRead);
        bad_ttl.ttl_hours = 48;
        assert!(matches!(db.create_secret(&bad_ttl, t0()), Err(StoreError::Validation(_))));

        let big = "A".repeat(MAX_NOTE_CHARS + 4);
        let mut too_big = note(BurnMode::BurnOnRead);
        too_big.ciphertext = &big;
        assert!(matches!(db.create_secret(&too_big, t0()), Err(StoreError::TooLarge)));

        assert_eq!(count(&db, "secrets"), 0);
    }
}
