pub mod error;
pub mod expiry;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod reaper;
pub mod rooms;
pub mod secrets;
pub mod validate;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use tracing::{debug, info};

pub use error::StoreError;
pub use expiry::Lifetimes;

const READER_POOL_SIZE: usize = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);
const MAX_BUSY_RETRIES: u32 = 3;
const BUSY_BACKOFF: Duration = Duration::from_millis(25);

/// SQLite-backed store for notes, rooms and chat messages.
///
/// One writer connection handles every statement that can delete or insert,
/// always inside an `IMMEDIATE` transaction, so check-then-delete sequences
/// never interleave. Plain listings go through a small read-only pool.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
    lifetimes: Lifetimes,
}

impl Database {
    pub fn open(path: &Path, lifetimes: Lifetimes) -> Result<Self, StoreError> {
        let writer = Connection::open(path)?;

        // WAL mode for concurrent reads
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run(&writer)?;

        let mut readers = Vec::with_capacity(READER_POOL_SIZE);
        for _ in 0..READER_POOL_SIZE {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (1 writer + {} readers)",
            path.display(),
            READER_POOL_SIZE
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
            lifetimes,
        })
    }

    /// Private in-memory database; every query runs on the single writer.
    pub fn open_in_memory(lifetimes: Lifetimes) -> Result<Self, StoreError> {
        let writer = Connection::open_in_memory()?;
        migrations::run(&writer)?;

        Ok(Self {
            writer: Mutex::new(writer),
            readers: Vec::new(),
            reader_idx: AtomicUsize::new(0),
            lifetimes,
        })
    }

    pub fn lifetimes(&self) -> &Lifetimes {
        &self.lifetimes
    }

    /// Run a read-only query on one of the pooled reader connections.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        if self.readers.is_empty() {
            let conn = self.lock_writer()?;
            return f(&conn);
        }

        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .lock()
            .map_err(|e| anyhow::anyhow!("Reader lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Run `f` inside an `IMMEDIATE` transaction on the writer connection.
    ///
    /// The transaction commits only when `f` returns `Ok`. Lock contention is
    /// retried a bounded number of times before surfacing as
    /// [`StoreError::StorageTimeout`], so `f` may run more than once.
    pub fn with_tx<F, T>(&self, mut f: F) -> Result<T, StoreError>
    where
        F: FnMut(&Transaction<'_>) -> Result<T, StoreError>,
    {
        let mut conn = self.lock_writer()?;
        let mut attempt = 0;

        loop {
            match run_immediate(&mut conn, &mut f) {
                Err(StoreError::StorageTimeout) if attempt < MAX_BUSY_RETRIES => {
                    attempt += 1;
                    debug!("Writer busy, retrying (attempt {})", attempt);
                    std::thread::sleep(BUSY_BACKOFF * attempt);
                }
                result => return result,
            }
        }
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Writer lock poisoned: {}", e).into())
    }
}

fn run_immediate<F, T>(conn: &mut Connection, f: &mut F) -> Result<T, StoreError>
where
    F: FnMut(&Transaction<'_>) -> Result<T, StoreError>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

/// Milliseconds since the Unix epoch, the unit of every stored timestamp.
pub fn millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// 128-bit random identifier as 32 lowercase hex characters.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// 256-bit capability secret as 64 lowercase hex characters.
pub(crate) fn new_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_have_expected_shape() {
        let id = new_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_id());

        assert_eq!(new_token().len(), 64);
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let db = test_support::db();
        let res: Result<(), StoreError> = db.with_tx(|tx| {
            tx.execute(
                "INSERT INTO rooms (id, kind, created_at, last_active) VALUES ('r', 'public', 0, 0)",
                [],
            )?;
            Err(StoreError::Forbidden)
        });
        assert!(matches!(res, Err(StoreError::Forbidden)));
        assert_eq!(test_support::count(&db, "rooms"), 0);
    }

    #[test]
    fn file_database_serves_reads_from_pool() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wisp.db");
        let now = test_support::t0();

        let db = Database::open(&path, Lifetimes::default()).unwrap();
        assert_eq!(db.readers.len(), READER_POOL_SIZE);

        let id = db.create_public_room("Lobby", "c2FsdA==", now).unwrap();
        for _ in 0..READER_POOL_SIZE + 1 {
            let rooms = db.list_public_rooms(now).unwrap();
            assert_eq!(rooms.len(), 1);
            assert_eq!(rooms[0].id, id);
        }
        assert_eq!(db.room_info(&id, now).unwrap().salt.as_deref(), Some("c2FsdA=="));

        let mode: String = db
            .with_conn(|conn| Ok(conn.query_row("PRAGMA journal_mode", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        drop(db);

        // Reopening runs migrations again without touching existing rows.
        let db = Database::open(&path, Lifetimes::default()).unwrap();
        assert_eq!(test_support::count(&db, "rooms"), 1);
    }
}
