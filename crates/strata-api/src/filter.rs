//! Handlers for `GET /filter` and `GET /filter_advanced`.
//!
//! Missing parameters are passed on empty so that authorization is checked
//! before validation.

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use serde_json::Value;
use strata_core::{Gateway, Row, catalog::Backend};

use crate::{auth::ApiKey, error::ApiError};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchParams {
  pub table_name:    String,
  pub column:        String,
  pub search_string: String,
}

/// `GET /filter?table_name=<t>&column=<c>&search_string=<s>`, a substring match.
pub async fn search<S>(
  State(gateway): State<Gateway<S>>,
  key: ApiKey,
  Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Row>>, ApiError>
where
  S: Backend + 'static,
{
  let rows = gateway
    .search(
      key.as_deref(),
      &params.table_name,
      &params.column,
      &params.search_string,
    )
    .await?;
  Ok(Json(rows))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompareParams {
  pub table_name: String,
  pub column:     String,
  /// Operator token, e.g. `Greater than` or `gt`.
  pub condition:  String,
  pub value:      String,
}

/// `GET /filter_advanced?table_name=<t>&column=<c>&condition=<op>&value=<v>`
pub async fn compare<S>(
  State(gateway): State<Gateway<S>>,
  key: ApiKey,
  Query(params): Query<CompareParams>,
) -> Result<Json<Vec<Row>>, ApiError>
where
  S: Backend + 'static,
{
  let rows = gateway
    .compare(
      key.as_deref(),
      &params.table_name,
      &params.column,
      &params.condition,
      Value::String(params.value),
    )
    .await?;
  Ok(Json(rows))
}
