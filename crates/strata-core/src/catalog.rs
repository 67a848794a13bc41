//! The storage traits and the statement type handed to backends.
//!
//! Traits are implemented by storage backends (e.g. `strata-store-sqlite`).
//! The engine, query builder and access control only ever see these
//! abstractions; all catalog truth lives in the backend, so several
//! instances may safely share one database.

use std::{collections::BTreeSet, future::Future};

use serde_json::Value;

use crate::{Record, Result, Row, access::Credential, column::Column};

// ─── Schema catalog ──────────────────────────────────────────────────────────

/// Authoritative view of table and column existence and unique indexes.
///
/// Every method re-reads the backend. Mutations are committed before the
/// returned future resolves.
pub trait SchemaCatalog: Send + Sync {
  fn table_exists<'a>(
    &'a self,
    table: &'a str,
  ) -> impl Future<Output = Result<bool>> + Send + 'a;

  /// Create `table` with the surrogate identity column plus `columns`.
  ///
  /// Fails with [`SchemaError::TableExists`](crate::SchemaError::TableExists)
  /// if the table is already present.
  fn create_table<'a>(
    &'a self,
    table: &'a str,
    columns: &'a [Column],
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Names of all columns of `table`, identity column included.
  fn existing_columns<'a>(
    &'a self,
    table: &'a str,
  ) -> impl Future<Output = Result<BTreeSet<String>>> + Send + 'a;

  /// Add `column` to `table`. A column that is already present is left alone.
  fn add_column<'a>(
    &'a self,
    table: &'a str,
    column: &'a Column,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Make `column` unique. Declaring the same column twice is a no-op.
  fn ensure_unique_index<'a>(
    &'a self,
    table: &'a str,
    column: &'a str,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// All user tables, internal tables excluded.
  fn list_tables(&self) -> impl Future<Output = Result<Vec<String>>> + Send + '_;

  /// Column names of `table` in declaration order.
  fn columns_of<'a>(
    &'a self,
    table: &'a str,
  ) -> impl Future<Output = Result<Vec<String>>> + Send + 'a;

  /// Columns covered by a single-column unique index.
  fn unique_columns<'a>(
    &'a self,
    table: &'a str,
  ) -> impl Future<Output = Result<Vec<String>>> + Send + 'a;
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// A fully validated `SELECT` with exactly one bound parameter.
///
/// Built only by [`QueryBuilder`](crate::query::QueryBuilder); every
/// identifier in `sql` has been checked against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
  pub sql:   String,
  pub param: Value,
}

pub trait RowStore: SchemaCatalog {
  /// Insert `record`, replacing any row that collides on a unique column.
  ///
  /// Each call is its own transaction.
  fn upsert_row<'a>(
    &'a self,
    table: &'a str,
    record: &'a Record,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  fn select<'a>(
    &'a self,
    statement: &'a SelectStatement,
  ) -> impl Future<Output = Result<Vec<Row>>> + Send + 'a;
}

// ─── Credentials ─────────────────────────────────────────────────────────────

/// Persistence and matching of credentials.
///
/// Token matching is the backend's job, so a stronger strategy (hashed
/// tokens, constant-time comparison) can be swapped in here.
pub trait CredentialStore: Send + Sync {
  fn find_credential<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Option<Credential>>> + Send + 'a;

  fn insert_credential<'a>(
    &'a self,
    credential: &'a Credential,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  fn count_credentials(&self) -> impl Future<Output = Result<u64>> + Send + '_;
}

/// Everything a [`Gateway`](crate::Gateway) needs from a backend.
pub trait Backend: RowStore + CredentialStore {}

impl<T: RowStore + CredentialStore> Backend for T {}
