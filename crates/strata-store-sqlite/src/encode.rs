//! Conversions between JSON values and SQLite values.
//!
//! Booleans are stored as the text `true`/`false`, objects and arrays as
//! compact JSON text. Timestamps are RFC 3339 strings.

use chrono::{DateTime, Utc};
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Number, Value};

use crate::{Error, Result};

// ─── JSON → SQLite ───────────────────────────────────────────────────────────

pub fn to_sql(value: &Value) -> SqlValue {
  match value {
    Value::Null => SqlValue::Null,
    Value::Bool(b) => SqlValue::Text(b.to_string()),
    Value::Number(n) => {
      if let Some(i) = n.as_i64() {
        SqlValue::Integer(i)
      } else if let Some(f) = n.as_f64() {
        // u64 values above i64::MAX land here too.
        SqlValue::Real(f)
      } else {
        SqlValue::Text(n.to_string())
      }
    }
    Value::String(s) => SqlValue::Text(s.clone()),
    Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
  }
}

// ─── SQLite → JSON ───────────────────────────────────────────────────────────

pub fn from_sql(value: ValueRef<'_>) -> Value {
  match value {
    ValueRef::Null => Value::Null,
    ValueRef::Integer(i) => Value::from(i),
    ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
    ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
    ValueRef::Blob(b) => Value::String(hex::encode(b)),
  }
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn scalars_map_to_native_sqlite_types() {
    assert_eq!(to_sql(&json!(3)), SqlValue::Integer(3));
    assert_eq!(to_sql(&json!(2.5)), SqlValue::Real(2.5));
    assert_eq!(to_sql(&json!("x")), SqlValue::Text("x".into()));
    assert_eq!(to_sql(&json!(true)), SqlValue::Text("true".into()));
    assert_eq!(to_sql(&json!(null)), SqlValue::Null);
  }

  #[test]
  fn nested_values_become_json_text() {
    assert_eq!(to_sql(&json!({"a": [1, 2]})), SqlValue::Text("{\"a\":[1,2]}".into()));
  }

  #[test]
  fn reading_back() {
    assert_eq!(from_sql(ValueRef::Integer(7)), json!(7));
    assert_eq!(from_sql(ValueRef::Real(1.5)), json!(1.5));
    assert_eq!(from_sql(ValueRef::Real(f64::NAN)), Value::Null);
    assert_eq!(from_sql(ValueRef::Text(b"hi")), json!("hi"));
    assert_eq!(from_sql(ValueRef::Blob(&[0xde, 0xad])), json!("dead"));
  }

  #[test]
  fn timestamps_roundtrip() {
    let now = Utc::now();
    assert_eq!(decode_dt(&encode_dt(now)).unwrap(), now);
    assert!(decode_dt("yesterday").is_err());
  }
}
