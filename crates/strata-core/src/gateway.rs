//! [`Gateway`]: the authorized entry points over a backend.
//!
//! Every method checks the caller's token before it touches the catalog or
//! the stored tables.

use std::sync::Arc;

use serde_json::Value;

use crate::{
  Error, Record, Result, Row, SchemaError,
  access::{AccessControl, Credential, Permission, PermissionSet},
  catalog::Backend,
  ingest::{IngestReport, IngestionEngine, records_from_value},
  keys::KeyIssuer,
  query::{Operator, Predicate, QueryBuilder},
};

/// Cloning is cheap; the backend is reference-counted.
pub struct Gateway<S> {
  store: Arc<S>,
}

impl<S> Clone for Gateway<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

fn required<'v>(value: &'v str, field: &str) -> Result<&'v str> {
  if value.is_empty() {
    Err(Error::Validation(format!("{field} is required")))
  } else {
    Ok(value)
  }
}

impl<S: Backend> Gateway<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }

  async fn require(&self, token: Option<&str>, permission: Permission) -> Result<()> {
    AccessControl::new(&*self.store).require(token, permission).await
  }

  /// Ingest a batch into `table`. Requires `write`.
  pub async fn ingest(
    &self,
    token: Option<&str>,
    table: &str,
    records: &[Record],
    unique_keys: &[String],
  ) -> Result<IngestReport> {
    self.require(token, Permission::Write).await?;
    IngestionEngine::new(&*self.store)
      .ingest(table, records, unique_keys)
      .await
  }

  /// [`Gateway::ingest`] for a raw JSON body, which may be an array of
  /// objects or a single object. The body is only inspected once the caller
  /// holds `write`.
  pub async fn ingest_json(
    &self,
    token: Option<&str>,
    table: &str,
    body: Value,
    unique_keys: &[String],
  ) -> Result<IngestReport> {
    self.require(token, Permission::Write).await?;
    let records = records_from_value(body)?;
    IngestionEngine::new(&*self.store)
      .ingest(table, &records, unique_keys)
      .await
  }

  /// Requires `read`.
  pub async fn list_tables(&self, token: Option<&str>) -> Result<Vec<String>> {
    self.require(token, Permission::Read).await?;
    self.store.list_tables().await
  }

  /// Requires `read`. Internal tables are reported as not found.
  pub async fn columns(&self, token: Option<&str>, table: &str) -> Result<Vec<String>> {
    self.require(token, Permission::Read).await?;
    // A name that could never have been created simply does not exist.
    if crate::ident::validate(table).is_err() {
      return Err(SchemaError::TableNotFound(table.to_owned()).into());
    }
    self.store.columns_of(table).await
  }

  /// Substring filter. Requires `read`.
  pub async fn search(
    &self,
    token: Option<&str>,
    table: &str,
    column: &str,
    needle: &str,
  ) -> Result<Vec<Row>> {
    self.require(token, Permission::Read).await?;
    let table = required(table, "table name")?;
    let column = required(column, "column name")?;
    let needle = required(needle, "search string")?;
    QueryBuilder::new(&*self.store)
      .filter(table, column, &Predicate::Contains(needle.to_owned()))
      .await
  }

  /// Comparison filter; `operator` is any token [`Operator`] parses.
  /// Requires `read`.
  pub async fn compare(
    &self,
    token: Option<&str>,
    table: &str,
    column: &str,
    operator: &str,
    value: Value,
  ) -> Result<Vec<Row>> {
    self.require(token, Permission::Read).await?;
    let table = required(table, "table name")?;
    let column = required(column, "column name")?;
    let op: Operator = required(operator, "search condition")?.parse()?;
    if value.is_null() || value.as_str().is_some_and(str::is_empty) {
      return Err(Error::Validation("search value is required".into()));
    }
    QueryBuilder::new(&*self.store)
      .filter(table, column, &Predicate::Compare(op, value))
      .await
  }

  /// Mint a new API key. Requires `write`.
  pub async fn issue_key(
    &self,
    token: Option<&str>,
    permissions: PermissionSet,
  ) -> Result<Credential> {
    self.require(token, Permission::Write).await?;
    KeyIssuer::new(&*self.store).issue(permissions).await
  }

  /// [`Gateway::issue_key`] with permissions named as strings (`"read"`,
  /// `"write"`), parsed once the caller holds `write`.
  pub async fn issue_key_named(
    &self,
    token: Option<&str>,
    permissions: &[String],
  ) -> Result<Credential> {
    self.require(token, Permission::Write).await?;
    let permissions = permissions
      .iter()
      .map(|p| p.parse::<Permission>())
      .collect::<Result<PermissionSet>>()?;
    KeyIssuer::new(&*self.store).issue(permissions).await
  }

  /// Create the first privileged credential if none exist. Not gated: only
  /// callable by whoever owns the process.
  pub async fn bootstrap(&self, token: Option<String>) -> Result<Option<Credential>> {
    KeyIssuer::new(&*self.store).bootstrap(token).await
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::{QueryError, catalog::SchemaCatalog, testing::MemoryBackend};

  fn gateway() -> (Gateway<MemoryBackend>, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::default());
    backend.add_credential("admin", PermissionSet::ALL);
    backend.add_credential("reader", PermissionSet { read: true, write: false });
    (Gateway::new(Arc::clone(&backend)), backend)
  }

  fn batch(v: serde_json::Value) -> Vec<Record> {
    v.as_array()
      .unwrap()
      .iter()
      .map(|r| r.as_object().cloned().unwrap())
      .collect()
  }

  #[tokio::test]
  async fn read_only_key_cannot_ingest() {
    let (gw, backend) = gateway();
    let err = gw
      .ingest(Some("reader"), "t", &batch(json!([{"a": 1}])), &[])
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Authorization));
    assert!(backend.list_tables().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn filter_without_read_does_not_query() {
    let (gw, backend) = gateway();
    gw.ingest(Some("admin"), "t", &batch(json!([{"a": 1}])), &[])
      .await
      .unwrap();
    backend.add_credential("writer", PermissionSet { read: false, write: true });

    let err = gw.search(Some("writer"), "t", "a", "1").await.unwrap_err();
    assert!(matches!(err, Error::Authorization));
    let err = gw.compare(None, "t", "a", "eq", json!(1)).await.unwrap_err();
    assert!(matches!(err, Error::Authorization));
    assert!(backend.selects().is_empty());

    gw.search(Some("reader"), "t", "a", "1").await.unwrap();
    assert_eq!(backend.selects().len(), 1);
  }

  #[tokio::test]
  async fn compare_rejects_bad_operator_and_empty_value() {
    let (gw, _) = gateway();
    gw.ingest(Some("admin"), "t", &batch(json!([{"a": 1}])), &[])
      .await
      .unwrap();

    let err = gw.compare(Some("reader"), "t", "a", "between", json!("1")).await.unwrap_err();
    assert!(matches!(err, Error::Query(QueryError::InvalidOperator(_))));
    let err = gw.compare(Some("reader"), "t", "a", "eq", json!("")).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[tokio::test]
  async fn issued_read_key_reads_but_cannot_write() {
    let (gw, _) = gateway();
    gw.ingest(Some("admin"), "t", &batch(json!([{"a": 1}])), &[])
      .await
      .unwrap();

    let key = gw
      .issue_key(Some("admin"), [Permission::Read].into_iter().collect())
      .await
      .unwrap();
    let token = Some(key.token.as_str());

    assert_eq!(gw.list_tables(token).await.unwrap(), vec!["t"]);
    assert_eq!(gw.columns(token, "t").await.unwrap(), vec!["id", "a"]);
    assert!(matches!(
      gw.ingest(token, "t", &batch(json!([{"a": 2}])), &[]).await,
      Err(Error::Authorization)
    ));
    assert!(matches!(
      gw.issue_key(token, PermissionSet::ALL).await,
      Err(Error::Authorization)
    ));
  }

  #[tokio::test]
  async fn raw_input_is_inspected_only_after_authorization() {
    let (gw, backend) = gateway();

    let err = gw.ingest_json(None, "t", json!("not a batch"), &[]).await.unwrap_err();
    assert!(matches!(err, Error::Authorization));
    let err = gw
      .issue_key_named(Some("reader"), &["admin".to_owned()])
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Authorization));

    let err = gw.ingest_json(Some("admin"), "t", json!(3), &[]).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    let err = gw
      .issue_key_named(Some("admin"), &["admin".to_owned()])
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let report = gw
      .ingest_json(Some("admin"), "t", json!({"a": 1}), &[])
      .await
      .unwrap();
    assert_eq!(report.rows_written, 1);
    let cred = gw
      .issue_key_named(Some("admin"), &["read".to_owned(), "write".to_owned()])
      .await
      .unwrap();
    assert!(cred.allows(Permission::Write));
    assert_eq!(backend.rows("t").len(), 1);
  }

  #[tokio::test]
  async fn malformed_table_name_has_no_columns() {
    let (gw, _) = gateway();
    let err = gw.columns(Some("reader"), "x;DROP").await.unwrap_err();
    assert!(matches!(err, Error::Schema(SchemaError::TableNotFound(_))));
    let err = gw.columns(None, "x;DROP").await.unwrap_err();
    assert!(matches!(err, Error::Authorization));
  }
}
