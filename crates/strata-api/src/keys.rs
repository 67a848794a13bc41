//! Handler for `POST /generate_api_key`.

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use strata_core::{Gateway, catalog::Backend};

use crate::{auth::ApiKey, error::ApiError};

/// Body: `{"permissions": ["read", "write"]}`.
#[derive(Debug, Deserialize)]
pub struct GenerateBody {
  #[serde(default)]
  pub permissions: Vec<String>,
}

/// `POST /generate_api_key`. Responds 201 with `{token, permissions, created_at}`.
pub async fn generate<S>(
  State(gateway): State<Gateway<S>>,
  key: ApiKey,
  body: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Backend + 'static,
{
  let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  let credential = gateway
    .issue_key_named(key.as_deref(), &body.permissions)
    .await?;
  Ok((StatusCode::CREATED, Json(credential)))
}
