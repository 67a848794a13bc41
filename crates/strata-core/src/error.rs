//! Error types for `strata-core`.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A request field is missing or malformed.
  #[error("validation error: {0}")]
  Validation(String),

  #[error(transparent)]
  Schema(#[from] SchemaError),

  /// Schema reconciliation failed before any row was written.
  #[error("ingestion failed: {0}")]
  Ingestion(#[source] Box<Error>),

  #[error(transparent)]
  Query(#[from] QueryError),

  #[error("you don't have access to perform this action")]
  Authorization,

  /// The backend could not acquire its write lock in time. Safe to retry.
  #[error("storage is busy, retry later")]
  StorageBusy,

  #[error("backend error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
  #[error("table {0:?} does not exist")]
  TableNotFound(String),

  #[error("table {0:?} already exists")]
  TableExists(String),

  #[error("column {column:?} does not exist in table {table:?}")]
  ColumnNotFound { table: String, column: String },

  #[error("record has columns unknown to the schema: {}", .0.join(", "))]
  UnknownColumns(Vec<String>),

  #[error("schema conflict: {0}")]
  Conflict(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
  #[error("invalid search condition: {0:?}")]
  InvalidOperator(String),

  #[error("table {0:?} does not exist")]
  TableNotFound(String),

  #[error("column {column:?} does not exist in table {table:?}")]
  ColumnNotFound { table: String, column: String },
}

/// Stable classification of an [`Error`], safe to hand to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  Validation,
  Schema,
  Ingestion,
  Query,
  Authorization,
  StorageBusy,
  Backend,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::Validation(_) => ErrorKind::Validation,
      Error::Schema(_) => ErrorKind::Schema,
      Error::Ingestion(_) => ErrorKind::Ingestion,
      Error::Query(_) => ErrorKind::Query,
      Error::Authorization => ErrorKind::Authorization,
      Error::StorageBusy => ErrorKind::StorageBusy,
      Error::Backend(_) => ErrorKind::Backend,
    }
  }

  /// Whether repeating the same call may succeed.
  pub fn is_retryable(&self) -> bool {
    match self {
      Error::StorageBusy => true,
      Error::Ingestion(inner) => inner.is_retryable(),
      _ => false,
    }
  }

  /// Whether this is a "not found" for a table or column, in any layer.
  pub fn is_not_found(&self) -> bool {
    match self {
      Error::Schema(SchemaError::TableNotFound(_) | SchemaError::ColumnNotFound { .. }) => true,
      Error::Query(QueryError::TableNotFound(_) | QueryError::ColumnNotFound { .. }) => true,
      Error::Ingestion(inner) => inner.is_not_found(),
      _ => false,
    }
  }

  pub fn backend<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::Backend(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
