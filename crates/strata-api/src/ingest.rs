//! Handler for `POST /json`.
//!
//! Query parameters: `table_name` (required) and `unique_keys`, which may be
//! repeated or comma-separated. The body is a JSON array of objects, or a
//! single object treated as a one-record batch; its shape is checked by the
//! [`Gateway`] after authorization.

use axum::{
  Json,
  extract::{Query, State, rejection::JsonRejection},
};
use serde::Serialize;
use serde_json::Value;
use strata_core::{Gateway, catalog::Backend, ingest::IngestReport};

use crate::{auth::ApiKey, error::ApiError};

#[derive(Debug, Default, PartialEq)]
pub struct IngestParams {
  pub table_name:  String,
  pub unique_keys: Vec<String>,
}

impl FromIterator<(String, String)> for IngestParams {
  fn from_iter<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
    let mut params = Self::default();
    for (key, value) in pairs {
      match key.as_str() {
        "table_name" => params.table_name = value.trim().to_owned(),
        "unique_keys" => {
          for k in value.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            if !params.unique_keys.iter().any(|u| u == k) {
              params.unique_keys.push(k.to_owned());
            }
          }
        }
        _ => {}
      }
    }
    params
  }
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
  pub message: String,
  #[serde(flatten)]
  pub report:  IngestReport,
}

/// `POST /json?table_name=<t>[&unique_keys=<k>...]`
pub async fn handler<S>(
  State(gateway): State<Gateway<S>>,
  key: ApiKey,
  Query(pairs): Query<Vec<(String, String)>>,
  body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError>
where
  S: Backend + 'static,
{
  let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let params: IngestParams = pairs.into_iter().collect();

  let report = gateway
    .ingest_json(key.as_deref(), &params.table_name, body, &params.unique_keys)
    .await?;

  Ok(Json(IngestResponse {
    message: format!("JSON data stored in table '{}' successfully", report.table),
    report,
  }))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pairs(ps: &[(&str, &str)]) -> IngestParams {
    ps.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
  }

  #[test]
  fn unique_keys_repeated_or_comma_separated() {
    let p = pairs(&[
      ("table_name", "inventory"),
      ("unique_keys", "sku"),
      ("unique_keys", "ean, sku"),
      ("other", "ignored"),
    ]);
    assert_eq!(p.table_name, "inventory");
    assert_eq!(p.unique_keys, vec!["sku", "ean"]);
  }
}
