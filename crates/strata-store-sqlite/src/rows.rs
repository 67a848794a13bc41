//! [`RowStore`] for [`SqliteStore`]: upserts and filter execution.

use rusqlite::{ErrorCode, TransactionBehavior};
use strata_core::{
  Error as CoreError, Record, Row, SchemaError,
  catalog::{RowStore, SelectStatement},
  ident::{self, IDENTITY_COLUMN},
};

use crate::{
  encode::{from_sql, to_sql},
  store::SqliteStore,
};

/// Map a statement failure that says something about the row rather than
/// the database.
fn row_error(table: &str, err: &rusqlite::Error) -> Option<CoreError> {
  let rusqlite::Error::SqliteFailure(e, msg) = err else {
    return None;
  };
  let msg = msg.as_deref().unwrap_or_default();
  if e.code == ErrorCode::TypeMismatch {
    return Some(CoreError::Validation(format!(
      "{IDENTITY_COLUMN:?} must be an integer"
    )));
  }
  if let Some((_, column)) = msg.split_once("has no column named ") {
    return Some(SchemaError::UnknownColumns(vec![column.to_owned()]).into());
  }
  if msg.starts_with("no such table") {
    return Some(SchemaError::TableNotFound(table.to_owned()).into());
  }
  None
}

impl RowStore for SqliteStore {
  async fn upsert_row<'a>(&'a self, table: &'a str, record: &'a Record) -> strata_core::Result<()> {
    if record.is_empty() {
      return Err(CoreError::Validation("record has no keys".into()));
    }
    let mut names = Vec::with_capacity(record.len());
    let mut values = Vec::with_capacity(record.len());
    for (key, value) in record {
      ident::validate(key)?;
      names.push(ident::quote(key));
      values.push(to_sql(value));
    }
    let placeholders = (1..=values.len())
      .map(|i| format!("?{i}"))
      .collect::<Vec<_>>()
      .join(", ");
    let sql = format!(
      "INSERT OR REPLACE INTO {} ({}) VALUES ({placeholders})",
      ident::quote(table),
      names.join(", "),
    );
    let table = table.to_owned();

    self
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match tx.execute(&sql, rusqlite::params_from_iter(values)) {
          Ok(_) => {}
          Err(e) => match row_error(&table, &e) {
            Some(row_err) => return Ok(Err(row_err)),
            None => return Err(e.into()),
          },
        }
        tx.commit()?;
        Ok(Ok(()))
      })
      .await??;
    Ok(())
  }

  async fn select<'a>(&'a self, statement: &'a SelectStatement) -> strata_core::Result<Vec<Row>> {
    let sql = statement.sql.clone();
    let param = to_sql(&statement.param);

    let rows = self
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let width = stmt.column_count();
        let rows = stmt
          .query_map(rusqlite::params![param], |row| {
            (0..width)
              .map(|i| row.get_ref(i).map(from_sql))
              .collect::<rusqlite::Result<Row>>()
          })?
          .collect::<rusqlite::Result<Vec<Row>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }
}
