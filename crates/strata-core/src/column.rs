//! Column types and JSON type inference.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Storage type of a dynamically created column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
  Integer,
  Real,
  Text,
}

impl ColumnType {
  /// The SQL type name used in DDL.
  pub fn sql(self) -> &'static str {
    match self {
      ColumnType::Integer => "INTEGER",
      ColumnType::Real => "REAL",
      ColumnType::Text => "TEXT",
    }
  }
}

/// Map a JSON value to the column type it would create.
///
/// Integral numbers become `Integer`, other numbers `Real`, and everything
/// else (strings, booleans, null, objects, arrays) `Text`.
pub fn infer_type(value: &Value) -> ColumnType {
  match value {
    Value::Number(n) if n.is_i64() || n.is_u64() => ColumnType::Integer,
    Value::Number(_) => ColumnType::Real,
    _ => ColumnType::Text,
  }
}

/// A column to be created: name plus inferred type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
  pub name: String,
  pub ty:   ColumnType,
}

impl Column {
  pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
    Self { name: name.into(), ty }
  }

  /// Build a column from a record entry, inferring its type from `value`.
  pub fn inferred(name: &str, value: &Value) -> Self {
    Self::new(name, infer_type(value))
  }
}
