//! In-memory backend used by the unit tests of this crate.

use std::{
  collections::{BTreeMap, BTreeSet},
  sync::Mutex,
};

use chrono::Utc;
use serde_json::Value;

use crate::{
  Error, Record, Result, Row, SchemaError,
  access::{Credential, PermissionSet},
  catalog::{CredentialStore, RowStore, SchemaCatalog, SelectStatement},
  column::Column,
  ident::IDENTITY_COLUMN,
};

#[derive(Default)]
struct MemTable {
  columns: Vec<Column>,
  unique:  Vec<String>,
  rows:    Vec<Record>,
  next_id: i64,
}

#[derive(Default)]
struct Inner {
  tables:             BTreeMap<String, MemTable>,
  credentials:        Vec<Credential>,
  credential_lookups: usize,
  selects:            Vec<SelectStatement>,
  /// Columns a simulated concurrent writer creates right before our
  /// `create_table` runs.
  racer_columns:      Option<Vec<Column>>,
}

#[derive(Default)]
pub struct MemoryBackend {
  inner: Mutex<Inner>,
}

impl MemoryBackend {
  fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
    self.inner.lock().unwrap()
  }

  pub fn add_credential(&self, token: &str, permissions: PermissionSet) {
    self.lock().credentials.push(Credential {
      token: token.into(),
      permissions,
      created_at: Utc::now(),
    });
  }

  pub fn credential_lookups(&self) -> usize { self.lock().credential_lookups }

  pub fn selects(&self) -> Vec<SelectStatement> { self.lock().selects.clone() }

  pub fn race_create_table(&self, columns: Vec<Column>) {
    self.lock().racer_columns = Some(columns);
  }

  pub fn rows(&self, table: &str) -> Vec<Record> {
    self
      .lock()
      .tables
      .get(table)
      .map(|t| t.rows.clone())
      .unwrap_or_default()
  }
}

fn new_table(columns: &[Column]) -> MemTable {
  let mut all = vec![Column::new(IDENTITY_COLUMN, crate::column::ColumnType::Integer)];
  all.extend(
    columns
      .iter()
      .filter(|c| c.name != IDENTITY_COLUMN)
      .cloned(),
  );
  MemTable { columns: all, next_id: 1, ..Default::default() }
}

fn not_found(table: &str) -> Error {
  SchemaError::TableNotFound(table.to_owned()).into()
}

impl SchemaCatalog for MemoryBackend {
  async fn table_exists<'a>(&'a self, table: &'a str) -> Result<bool> {
    Ok(self.lock().tables.contains_key(table))
  }

  async fn create_table<'a>(&'a self, table: &'a str, columns: &'a [Column]) -> Result<()> {
    let mut inner = self.lock();
    if let Some(racer) = inner.racer_columns.take() {
      inner.tables.insert(table.to_owned(), new_table(&racer));
    }
    if inner.tables.contains_key(table) {
      return Err(SchemaError::TableExists(table.to_owned()).into());
    }
    inner.tables.insert(table.to_owned(), new_table(columns));
    Ok(())
  }

  async fn existing_columns<'a>(&'a self, table: &'a str) -> Result<BTreeSet<String>> {
    let inner = self.lock();
    let t = inner.tables.get(table).ok_or_else(|| not_found(table))?;
    Ok(t.columns.iter().map(|c| c.name.clone()).collect())
  }

  async fn add_column<'a>(&'a self, table: &'a str, column: &'a Column) -> Result<()> {
    let mut inner = self.lock();
    let t = inner.tables.get_mut(table).ok_or_else(|| not_found(table))?;
    if !t.columns.iter().any(|c| c.name == column.name) {
      t.columns.push(column.clone());
    }
    Ok(())
  }

  async fn ensure_unique_index<'a>(&'a self, table: &'a str, column: &'a str) -> Result<()> {
    let mut inner = self.lock();
    let t = inner.tables.get_mut(table).ok_or_else(|| not_found(table))?;
    if !t.columns.iter().any(|c| c.name == column) {
      return Err(
        SchemaError::ColumnNotFound { table: table.into(), column: column.into() }.into(),
      );
    }
    if column != IDENTITY_COLUMN && !t.unique.iter().any(|u| u == column) {
      t.unique.push(column.to_owned());
    }
    Ok(())
  }

  async fn list_tables(&self) -> Result<Vec<String>> {
    Ok(self.lock().tables.keys().cloned().collect())
  }

  async fn columns_of<'a>(&'a self, table: &'a str) -> Result<Vec<String>> {
    let inner = self.lock();
    let t = inner.tables.get(table).ok_or_else(|| not_found(table))?;
    Ok(t.columns.iter().map(|c| c.name.clone()).collect())
  }

  async fn unique_columns<'a>(&'a self, table: &'a str) -> Result<Vec<String>> {
    let inner = self.lock();
    let t = inner.tables.get(table).ok_or_else(|| not_found(table))?;
    Ok(t.unique.clone())
  }
}

impl RowStore for MemoryBackend {
  async fn upsert_row<'a>(&'a self, table: &'a str, record: &'a Record) -> Result<()> {
    let mut inner = self.lock();
    let t = inner.tables.get_mut(table).ok_or_else(|| not_found(table))?;

    let unknown: Vec<String> = record
      .keys()
      .filter(|k| !t.columns.iter().any(|c| &c.name == *k))
      .cloned()
      .collect();
    if !unknown.is_empty() {
      return Err(SchemaError::UnknownColumns(unknown).into());
    }

    let mut row = record.clone();
    let keys: Vec<String> = std::iter::once(IDENTITY_COLUMN.to_owned())
      .chain(t.unique.iter().cloned())
      .collect();
    t.rows.retain(|existing| {
      !keys.iter().any(|k| {
        matches!((existing.get(k), row.get(k)), (Some(a), Some(b)) if !b.is_null() && a == b)
      })
    });
    if !row.contains_key(IDENTITY_COLUMN) {
      row.insert(IDENTITY_COLUMN.into(), Value::from(t.next_id));
      t.next_id += 1;
    }
    t.rows.push(row);
    Ok(())
  }

  async fn select<'a>(&'a self, statement: &'a SelectStatement) -> Result<Vec<Row>> {
    self.lock().selects.push(statement.clone());
    Ok(Vec::new())
  }
}

impl CredentialStore for MemoryBackend {
  async fn find_credential<'a>(&'a self, token: &'a str) -> Result<Option<Credential>> {
    let mut inner = self.lock();
    inner.credential_lookups += 1;
    Ok(inner.credentials.iter().find(|c| c.token == token).cloned())
  }

  async fn insert_credential<'a>(&'a self, credential: &'a Credential) -> Result<()> {
    let mut inner = self.lock();
    if inner.credentials.iter().any(|c| c.token == credential.token) {
      return Err(Error::Validation("duplicate token".into()));
    }
    inner.credentials.push(credential.clone());
    Ok(())
  }

  async fn count_credentials(&self) -> Result<u64> {
    Ok(self.lock().credentials.len() as u64)
  }
}
