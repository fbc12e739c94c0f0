use rusqlite::ErrorCode;

/// Everything the lifecycle operations can report back to the boundary layer.
///
/// `NotFound`, `Expired` and `RoomGone` are all terminal absence states; they
/// only differ so the client can show a more helpful message.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("payload too large")]
    TooLarge,

    #[error("not found")]
    NotFound,

    #[error("expired")]
    Expired,

    #[error("room gone")]
    RoomGone,

    #[error("forbidden")]
    Forbidden,

    #[error("storage timed out")]
    StorageTimeout,

    #[error("sqlite: {0}")]
    Sqlite(rusqlite::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl StoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => Self::StorageTimeout,
            _ => Self::Sqlite(err),
        }
    }
}
