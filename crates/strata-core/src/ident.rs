//! SQL identifier rules.
//!
//! Table and column names come from request input and end up in query text,
//! so they are validated here and always emitted double-quoted.

use crate::{Error, Result};

/// Surrogate identity column present on every ingested table.
pub const IDENTITY_COLUMN: &str = "id";

/// The credential table; never visible through the catalog.
pub const CREDENTIALS_TABLE: &str = "credentials";

const MAX_LEN: usize = 128;

/// Check that `name` is usable as a table or column name.
///
/// Accepts ASCII letters, digits and underscores, not starting with a digit.
pub fn validate(name: &str) -> Result<()> {
  if name.is_empty() {
    return Err(Error::Validation("identifier must not be empty".into()));
  }
  if name.len() > MAX_LEN {
    return Err(Error::Validation(format!(
      "identifier longer than {MAX_LEN} characters"
    )));
  }
  let mut chars = name.chars();
  let first_ok = chars
    .next()
    .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
  if !first_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
    return Err(Error::Validation(format!("invalid identifier: {name:?}")));
  }
  Ok(())
}

/// Check that `name` may be used for an ingested table.
pub fn validate_table(name: &str) -> Result<()> {
  validate(name)?;
  if is_internal(name) {
    return Err(Error::Validation(format!("table name {name:?} is reserved")));
  }
  Ok(())
}

/// Whether `name` refers to a table owned by the store rather than by users.
pub fn is_internal(name: &str) -> bool {
  name.eq_ignore_ascii_case(CREDENTIALS_TABLE)
    || name
      .get(..7)
      .is_some_and(|p| p.eq_ignore_ascii_case("sqlite_"))
}

/// Quote an identifier for inclusion in SQL text.
pub fn quote(name: &str) -> String {
  format!("\"{}\"", name.replace('"', "\"\""))
}
