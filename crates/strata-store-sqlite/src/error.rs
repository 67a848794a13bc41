//! Error type for `strata-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  /// `SQLITE_BUSY` or `SQLITE_LOCKED` after the busy timeout elapsed.
  #[error("database is busy")]
  Busy,

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Whether a SQLite failure is lock contention.
pub(crate) fn is_busy(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
  )
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(err: tokio_rusqlite::Error) -> Self {
    match err {
      tokio_rusqlite::Error::Rusqlite(ref e) if is_busy(e) => Error::Busy,
      other => Error::Database(other),
    }
  }
}

impl From<Error> for strata_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Busy => strata_core::Error::StorageBusy,
      other => strata_core::Error::backend(other),
    }
  }
}
