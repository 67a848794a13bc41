//! The ingestion engine: per-batch schema reconciliation plus row upsert.
//!
//! The schema is driven by the *first* record of a batch. Later records may
//! omit keys but may not introduce new ones; such rows are rejected
//! individually and reported alongside the rows that were written.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use crate::{
  Error, ErrorKind, Record, Result, SchemaError,
  catalog::RowStore,
  column::Column,
  ident,
};

/// Outcome of a successful [`IngestionEngine::ingest`] call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
  pub table:         String,
  pub rows_written:  usize,
  /// `true` if this call created the table.
  pub created_table: bool,
  /// Columns added by this call, in first-record order.
  pub added_columns: Vec<String>,
  pub failures:      Vec<RowFailure>,
}

/// A record that could not be written. Does not abort the batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
  /// Position of the record in the submitted batch.
  pub index:   usize,
  pub kind:    ErrorKind,
  pub message: String,
}

impl RowFailure {
  fn new(index: usize, err: &Error) -> Self {
    let message = match err {
      // Backend text may leak schema or query internals.
      Error::Backend(_) => "row could not be written".to_owned(),
      other => other.to_string(),
    };
    Self { index, kind: err.kind(), message }
  }
}

pub struct IngestionEngine<'a, S> {
  store: &'a S,
}

impl<'a, S: RowStore> IngestionEngine<'a, S> {
  pub fn new(store: &'a S) -> Self { Self { store } }

  /// Reconcile the schema of `table` with `records` and upsert every record.
  ///
  /// Request validation fails with [`Error::Validation`]; a failing schema
  /// step fails the whole call with [`Error::Ingestion`] before any row is
  /// written. Row-level failures end up in [`IngestReport::failures`].
  pub async fn ingest(
    &self,
    table: &str,
    records: &[Record],
    unique_keys: &[String],
  ) -> Result<IngestReport> {
    let first = validate_request(table, records, unique_keys)?;

    let mut report = IngestReport { table: table.to_owned(), ..Default::default() };
    self
      .reconcile(table, first, unique_keys, &mut report)
      .await
      .map_err(|e| Error::Ingestion(Box::new(e)))?;

    let known = self
      .lowercase_columns(table)
      .await
      .map_err(|e| Error::Ingestion(Box::new(e)))?;

    for (index, record) in records.iter().enumerate() {
      match self.write_row(table, record, &known).await {
        Ok(()) => report.rows_written += 1,
        Err(e) => {
          tracing::warn!(table, index, error = %e, "row rejected");
          report.failures.push(RowFailure::new(index, &e));
        }
      }
    }

    tracing::info!(
      table,
      rows_written = report.rows_written,
      failed = report.failures.len(),
      created = report.created_table,
      added = report.added_columns.len(),
      "batch ingested"
    );
    Ok(report)
  }

  /// Steps 1–3: create or evolve the table, then declare unique columns.
  ///
  /// Unique keys are checked against the resulting column set before any DDL
  /// runs, so a bad declaration leaves the schema untouched.
  async fn reconcile(
    &self,
    table: &str,
    first: &Record,
    unique_keys: &[String],
    report: &mut IngestReport,
  ) -> Result<()> {
    let existing = if self.store.table_exists(table).await? {
      Some(self.lowercase_columns(table).await?)
    } else {
      None
    };
    check_unique_keys(table, first, unique_keys, existing.as_ref())?;

    let existing = match existing {
      Some(existing) => Some(existing),
      None => {
        let columns: Vec<Column> = first
          .iter()
          .filter(|(k, _)| !k.eq_ignore_ascii_case(ident::IDENTITY_COLUMN))
          .map(|(k, v)| Column::inferred(k, v))
          .collect();
        match self.store.create_table(table, &columns).await {
          Ok(()) => {
            tracing::info!(table, columns = columns.len(), "table created");
            report.created_table = true;
            None
          }
          // Someone else created it first; evolve their schema instead.
          Err(Error::Schema(SchemaError::TableExists(_))) => {
            tracing::debug!(table, "table created concurrently");
            Some(self.lowercase_columns(table).await?)
          }
          Err(e) => return Err(e),
        }
      }
    };

    if let Some(existing) = existing {
      for (key, value) in first {
        if existing.contains(&key.to_ascii_lowercase()) {
          continue;
        }
        let column = Column::inferred(key, value);
        self.store.add_column(table, &column).await?;
        tracing::info!(table, column = %key, ty = column.ty.sql(), "column added");
        report.added_columns.push(key.clone());
      }
    }

    for key in unique_keys {
      self.store.ensure_unique_index(table, key).await?;
    }
    Ok(())
  }

  async fn lowercase_columns(&self, table: &str) -> Result<BTreeSet<String>> {
    Ok(
      self
        .store
        .existing_columns(table)
        .await?
        .into_iter()
        .map(|c| c.to_ascii_lowercase())
        .collect(),
    )
  }

  async fn write_row(&self, table: &str, record: &Record, known: &BTreeSet<String>) -> Result<()> {
    if record.is_empty() {
      return Err(Error::Validation("record has no keys".into()));
    }
    reject_case_duplicates(record)?;
    let unknown: Vec<String> = record
      .keys()
      .filter(|k| !known.contains(&k.to_ascii_lowercase()))
      .cloned()
      .collect();
    if !unknown.is_empty() {
      return Err(SchemaError::UnknownColumns(unknown).into());
    }
    self.store.upsert_row(table, record).await
  }
}

/// Turn a JSON body into a batch: an array of objects, or a single object
/// taken as a one-record batch.
pub fn records_from_value(body: Value) -> Result<Vec<Record>> {
  match body {
    Value::Object(record) => Ok(vec![record]),
    Value::Array(items) => items
      .into_iter()
      .enumerate()
      .map(|(i, item)| match item {
        Value::Object(record) => Ok(record),
        _ => Err(Error::Validation(format!("record {i} is not a JSON object"))),
      })
      .collect(),
    _ => Err(Error::Validation(
      "body must be a JSON object or an array of objects".into(),
    )),
  }
}

/// Column names are case-insensitive, so `a` and `A` would land in the same
/// column.
fn reject_case_duplicates(record: &Record) -> Result<()> {
  let mut seen = BTreeSet::new();
  for key in record.keys() {
    if !seen.insert(key.to_ascii_lowercase()) {
      return Err(Error::Validation(format!(
        "key {key:?} differs from another key only by case"
      )));
    }
  }
  Ok(())
}

/// Every unique key must name the identity column, a key of the first
/// record, or a column the table already has.
fn check_unique_keys(
  table: &str,
  first: &Record,
  unique_keys: &[String],
  existing: Option<&BTreeSet<String>>,
) -> Result<()> {
  for key in unique_keys {
    let lower = key.to_ascii_lowercase();
    let known = lower == ident::IDENTITY_COLUMN
      || first.keys().any(|k| k.eq_ignore_ascii_case(key))
      || existing.is_some_and(|cols| cols.contains(&lower));
    if !known {
      return Err(
        SchemaError::ColumnNotFound { table: table.to_owned(), column: key.clone() }.into(),
      );
    }
  }
  Ok(())
}

fn validate_request<'r>(
  table: &str,
  records: &'r [Record],
  unique_keys: &[String],
) -> Result<&'r Record> {
  if table.is_empty() {
    return Err(Error::Validation("table name is required".into()));
  }
  ident::validate_table(table)?;

  let first = records
    .first()
    .ok_or_else(|| Error::Validation("at least one record is required".into()))?;
  if first.is_empty() {
    return Err(Error::Validation("the first record has no keys".into()));
  }
  for key in first.keys() {
    ident::validate(key)?;
  }
  reject_case_duplicates(first)?;
  for key in unique_keys {
    ident::validate(key)?;
  }
  Ok(first)
}
