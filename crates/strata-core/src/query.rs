//! Filter queries over ingested tables.
//!
//! Identifiers are resolved against the catalog before they are placed in
//! query text; the filter value is always a bound parameter.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  QueryError, Result, Row,
  catalog::{RowStore, SchemaCatalog, SelectStatement},
  ident,
};

// ─── Operators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
  Equal,
  NotEqual,
  GreaterThan,
  LessThan,
  GreaterOrEqual,
  LessOrEqual,
}

impl Operator {
  pub fn sql(self) -> &'static str {
    match self {
      Operator::Equal => "=",
      Operator::NotEqual => "!=",
      Operator::GreaterThan => ">",
      Operator::LessThan => "<",
      Operator::GreaterOrEqual => ">=",
      Operator::LessOrEqual => "<=",
    }
  }
}

impl fmt::Display for Operator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.sql()) }
}

/// Accepts variant names, short forms, SQL symbols, and the dashboard labels
/// (`"Greater than or Equal to"` and friends). Matching ignores case and
/// surrounding whitespace.
impl FromStr for Operator {
  type Err = QueryError;

  fn from_str(s: &str) -> Result<Self, QueryError> {
    let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "");
    let op = match normalized.as_str() {
      "equal" | "equalto" | "eq" | "=" | "==" => Operator::Equal,
      "notequal" | "notequalto" | "ne" | "!=" | "<>" => Operator::NotEqual,
      "greaterthan" | "gt" | ">" => Operator::GreaterThan,
      "lessthan" | "lt" | "<" => Operator::LessThan,
      "greaterorequal" | "greaterthanorequalto" | "ge" | "gte" | ">=" => {
        Operator::GreaterOrEqual
      }
      "lessorequal" | "lessthanorequalto" | "le" | "lte" | "<=" => Operator::LessOrEqual,
      _ => return Err(QueryError::InvalidOperator(s.to_owned())),
    };
    Ok(op)
  }
}

// ─── Predicates ──────────────────────────────────────────────────────────────

/// The two supported query shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
  /// Rows whose column textually contains the needle.
  Contains(String),
  /// Rows whose column compares to the value with the operator.
  Compare(Operator, Value),
}

/// Escape `LIKE` wildcards so the needle matches literally under
/// `ESCAPE '\'`.
fn like_pattern(needle: &str) -> String {
  let mut out = String::with_capacity(needle.len() + 2);
  out.push('%');
  for c in needle.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

// ─── Builder ─────────────────────────────────────────────────────────────────

pub struct QueryBuilder<'a, S> {
  catalog: &'a S,
}

impl<'a, S: SchemaCatalog> QueryBuilder<'a, S> {
  pub fn new(catalog: &'a S) -> Self { Self { catalog } }

  /// Resolve identifiers and build the statement without running it.
  pub async fn build(
    &self,
    table: &str,
    column: &str,
    predicate: &Predicate,
  ) -> Result<SelectStatement> {
    let table = self.resolve_table(table).await?;
    let columns = self.catalog.columns_of(&table).await?;
    let column = columns
      .iter()
      .find(|c| c.eq_ignore_ascii_case(column))
      .ok_or_else(|| QueryError::ColumnNotFound {
        table:  table.clone(),
        column: column.to_owned(),
      })?;

    let projection = columns
      .iter()
      .map(|c| ident::quote(c))
      .collect::<Vec<_>>()
      .join(", ");
    let target = ident::quote(column);

    let (condition, param) = match predicate {
      Predicate::Contains(needle) => (
        format!("{target} LIKE ?1 ESCAPE '\\'"),
        Value::String(like_pattern(needle)),
      ),
      Predicate::Compare(op, value) => (format!("{target} {} ?1", op.sql()), value.clone()),
    };

    Ok(SelectStatement {
      sql: format!(
        "SELECT {projection} FROM {} WHERE {condition}",
        ident::quote(&table)
      ),
      param,
    })
  }

  /// Only names the catalog lists are accepted; the canonical spelling is
  /// returned.
  async fn resolve_table(&self, table: &str) -> Result<String> {
    let tables = self.catalog.list_tables().await?;
    tables
      .into_iter()
      .find(|t| t.eq_ignore_ascii_case(table))
      .ok_or_else(|| QueryError::TableNotFound(table.to_owned()).into())
  }
}

impl<'a, S: RowStore> QueryBuilder<'a, S> {
  /// Run a filter and return matching rows in table column order.
  pub async fn filter(&self, table: &str, column: &str, predicate: &Predicate) -> Result<Vec<Row>> {
    let statement = self.build(table, column, predicate).await?;
    tracing::debug!(sql = %statement.sql, "running filter");
    self.catalog.select(&statement).await
  }
}
