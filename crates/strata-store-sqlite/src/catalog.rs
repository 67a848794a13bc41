//! [`SchemaCatalog`] for [`SqliteStore`].
//!
//! Catalog reads go straight to `sqlite_master` and the `pragma_*` table
//! functions, with names bound as parameters. Mutations run in `BEGIN
//! IMMEDIATE` transactions so the existence check and the DDL are atomic
//! with respect to other connections.

use std::collections::BTreeSet;

use rusqlite::{Connection, ErrorCode, OptionalExtension as _, TransactionBehavior};
use strata_core::{
  SchemaError,
  catalog::SchemaCatalog,
  column::Column,
  ident::{self, IDENTITY_COLUMN},
};

use crate::store::SqliteStore;

// ─── Connection-level helpers ────────────────────────────────────────────────

/// Canonical spelling of a user table, or `None` if it does not exist.
pub(crate) fn table_name(conn: &Connection, table: &str) -> rusqlite::Result<Option<String>> {
  if ident::is_internal(table) {
    return Ok(None);
  }
  conn
    .query_row(
      "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
      rusqlite::params![table],
      |row| row.get(0),
    )
    .optional()
}

/// Column names of `table` in declaration order.
pub(crate) fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
  let columns = stmt
    .query_map(rusqlite::params![table], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;
  Ok(columns)
}

/// Columns covered by a unique index over exactly that one column.
fn unique_single_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare("SELECT name FROM pragma_index_list(?1) WHERE \"unique\" = 1")?;
  let index_names = stmt
    .query_map(rusqlite::params![table], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;

  let mut out = Vec::new();
  let mut stmt = conn.prepare("SELECT name FROM pragma_index_info(?1)")?;
  for index in index_names {
    let cols: Vec<String> = stmt
      .query_map(rusqlite::params![index], |row| row.get(0))?
      .collect::<rusqlite::Result<_>>()?;
    if let [only] = cols.as_slice()
      && !out.iter().any(|c: &String| c.eq_ignore_ascii_case(only))
    {
      out.push(only.clone());
    }
  }
  Ok(out)
}

fn find_column<'c>(columns: &'c [String], name: &str) -> Option<&'c String> {
  columns.iter().find(|c| c.eq_ignore_ascii_case(name))
}

fn not_found(table: &str) -> SchemaError { SchemaError::TableNotFound(table.to_owned()) }

/// Index and table names share one namespace. `:` never appears in a valid
/// identifier, so this cannot clash with a user table or with the index of
/// another `(table, column)` pair.
pub(crate) fn unique_index_name(table: &str, column: &str) -> String {
  format!(
    "unique:{}:{}",
    table.to_ascii_lowercase(),
    column.to_ascii_lowercase()
  )
}

fn column_ddl(column: &Column) -> String {
  format!("{} {}", ident::quote(&column.name), column.ty.sql())
}

// ─── SchemaCatalog impl ──────────────────────────────────────────────────────

impl SchemaCatalog for SqliteStore {
  async fn table_exists<'a>(&'a self, table: &'a str) -> strata_core::Result<bool> {
    let table = table.to_owned();
    let found = self
      .call(move |conn| Ok(table_name(conn, &table)?.is_some()))
      .await?;
    Ok(found)
  }

  async fn create_table<'a>(
    &'a self,
    table: &'a str,
    columns: &'a [Column],
  ) -> strata_core::Result<()> {
    ident::validate_table(table)?;
    let mut seen = BTreeSet::from([IDENTITY_COLUMN.to_owned()]);
    let mut defs = vec![format!("{} INTEGER PRIMARY KEY", ident::quote(IDENTITY_COLUMN))];
    for column in columns {
      ident::validate(&column.name)?;
      if seen.insert(column.name.to_ascii_lowercase()) {
        defs.push(column_ddl(column));
      }
    }
    let ddl = format!("CREATE TABLE {} ({})", ident::quote(table), defs.join(", "));
    let table = table.to_owned();

    self
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if table_name(&tx, &table)?.is_some() {
          return Ok(Err(SchemaError::TableExists(table)));
        }
        tx.execute_batch(&ddl)?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await??;
    Ok(())
  }

  async fn existing_columns<'a>(&'a self, table: &'a str) -> strata_core::Result<BTreeSet<String>> {
    let columns = self.columns_of(table).await?;
    Ok(columns.into_iter().collect())
  }

  async fn add_column<'a>(&'a self, table: &'a str, column: &'a Column) -> strata_core::Result<()> {
    ident::validate(&column.name)?;
    let ddl_column = column_ddl(column);
    let table = table.to_owned();
    let name = column.name.clone();

    let added = self
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(canonical) = table_name(&tx, &table)? else {
          return Ok(Err(not_found(&table)));
        };
        if find_column(&table_columns(&tx, &canonical)?, &name).is_some() {
          return Ok(Ok(false));
        }
        let sql = format!("ALTER TABLE {} ADD COLUMN {ddl_column}", ident::quote(&canonical));
        match tx.execute_batch(&sql) {
          Ok(()) => {}
          Err(rusqlite::Error::SqliteFailure(_, Some(msg)))
            if msg.starts_with("duplicate column name") =>
          {
            return Ok(Ok(false));
          }
          Err(e) => return Err(e.into()),
        }
        tx.commit()?;
        Ok(Ok(true))
      })
      .await??;

    if !added {
      tracing::debug!(column = %column.name, "column already present");
    }
    Ok(())
  }

  async fn ensure_unique_index<'a>(
    &'a self,
    table: &'a str,
    column: &'a str,
  ) -> strata_core::Result<()> {
    ident::validate(column)?;
    let table = table.to_owned();
    let column = column.to_owned();

    self
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(table) = table_name(&tx, &table)? else {
          return Ok(Err(not_found(&table)));
        };
        let columns = table_columns(&tx, &table)?;
        let Some(column) = find_column(&columns, &column).cloned() else {
          return Ok(Err(SchemaError::ColumnNotFound { table, column }));
        };
        // The identity column is the rowid and unique already.
        if column.eq_ignore_ascii_case(IDENTITY_COLUMN) {
          return Ok(Ok(()));
        }
        let unique = unique_single_columns(&tx, &table)?;
        if find_column(&unique, &column).is_some() {
          return Ok(Ok(()));
        }

        let sql = format!(
          "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
          ident::quote(&unique_index_name(&table, &column)),
          ident::quote(&table),
          ident::quote(&column),
        );
        match tx.execute_batch(&sql) {
          Ok(()) => {}
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::ConstraintViolation =>
          {
            return Ok(Err(SchemaError::Conflict(format!(
              "column {column:?} already holds duplicate values"
            ))));
          }
          Err(e) => return Err(e.into()),
        }
        if find_column(&unique_single_columns(&tx, &table)?, &column).is_none() {
          return Ok(Err(SchemaError::Conflict(format!(
            "unique index on {table}.{column} could not be created"
          ))));
        }
        tx.commit()?;
        tracing::info!(%table, %column, "unique index created");
        Ok(Ok(()))
      })
      .await??;
    Ok(())
  }

  async fn list_tables(&self) -> strata_core::Result<Vec<String>> {
    let tables: Vec<String> = self
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(tables.into_iter().filter(|t| !ident::is_internal(t)).collect())
  }

  async fn columns_of<'a>(&'a self, table: &'a str) -> strata_core::Result<Vec<String>> {
    let table = table.to_owned();
    let columns = self
      .call(move |conn| match table_name(conn, &table)? {
        Some(canonical) => Ok(Ok(table_columns(conn, &canonical)?)),
        None => Ok(Err(not_found(&table))),
      })
      .await??;
    Ok(columns)
  }

  async fn unique_columns<'a>(&'a self, table: &'a str) -> strata_core::Result<Vec<String>> {
    let table = table.to_owned();
    let columns = self
      .call(move |conn| match table_name(conn, &table)? {
        Some(canonical) => Ok(Ok(unique_single_columns(conn, &canonical)?)),
        None => Ok(Err(not_found(&table))),
      })
      .await??;
    Ok(columns)
  }
}
