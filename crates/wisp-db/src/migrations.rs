use rusqlite::Connection;
use tracing::info;

use crate::StoreError;

pub fn run(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE secrets (
                id              TEXT PRIMARY KEY,
                ciphertext      TEXT NOT NULL,
                iv              TEXT NOT NULL,
                salt            TEXT,
                burn_on_read    INTEGER NOT NULL DEFAULT 1,
                created_at      INTEGER NOT NULL,
                expire_at       INTEGER NOT NULL
            );

            CREATE INDEX idx_secrets_expire ON secrets(expire_at);

            CREATE TABLE rooms (
                id              TEXT PRIMARY KEY,
                kind            TEXT NOT NULL CHECK (kind IN ('public', 'temporary')),
                name            TEXT,
                salt            TEXT,
                owner_token     TEXT,
                created_at      INTEGER NOT NULL,
                last_active     INTEGER NOT NULL
            );

            CREATE INDEX idx_rooms_kind_created ON rooms(kind, created_at);
            CREATE INDEX idx_rooms_kind_active ON rooms(kind, last_active);

            -- room_id is deliberately not a foreign key: orphans are swept.
            CREATE TABLE messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                room_id         TEXT NOT NULL,
                ciphertext      TEXT NOT NULL,
                iv              TEXT NOT NULL,
                sender_id       TEXT NOT NULL,
                created_at      INTEGER NOT NULL
            );

            CREATE UNIQUE INDEX idx_messages_room_created ON messages(room_id, created_at);
            CREATE INDEX idx_messages_created ON messages(created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
