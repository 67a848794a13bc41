//! Handlers for `/tables` and `/columns/{table}`.

use axum::{
  Json,
  extract::{Path, State},
};
use strata_core::{Gateway, catalog::Backend};

use crate::{auth::ApiKey, error::ApiError};

/// `GET /tables`
pub async fn list<S>(
  State(gateway): State<Gateway<S>>,
  key: ApiKey,
) -> Result<Json<Vec<String>>, ApiError>
where
  S: Backend + 'static,
{
  Ok(Json(gateway.list_tables(key.as_deref()).await?))
}

/// `GET /columns/{table}`. 404 if the table does not exist.
pub async fn columns<S>(
  State(gateway): State<Gateway<S>>,
  key: ApiKey,
  Path(table): Path<String>,
) -> Result<Json<Vec<String>>, ApiError>
where
  S: Backend + 'static,
{
  Ok(Json(gateway.columns(key.as_deref(), &table).await?))
}
