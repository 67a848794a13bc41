//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error is rendered as `{"error": "...", "kind": "..."}`. Backend
//! failures are logged and replaced by a generic message.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use strata_core::{Error, ErrorKind, QueryError, SchemaError};
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Core(#[from] Error),
}

fn status_of(err: &Error) -> StatusCode {
  match err {
    Error::Validation(_) => StatusCode::BAD_REQUEST,
    Error::Schema(SchemaError::TableNotFound(_) | SchemaError::ColumnNotFound { .. }) => {
      StatusCode::NOT_FOUND
    }
    Error::Schema(SchemaError::UnknownColumns(_)) => StatusCode::BAD_REQUEST,
    Error::Schema(SchemaError::TableExists(_) | SchemaError::Conflict(_)) => StatusCode::CONFLICT,
    Error::Query(QueryError::InvalidOperator(_)) => StatusCode::BAD_REQUEST,
    Error::Query(_) => StatusCode::NOT_FOUND,
    Error::Authorization => StatusCode::FORBIDDEN,
    Error::StorageBusy => StatusCode::SERVICE_UNAVAILABLE,
    Error::Ingestion(inner) => status_of(inner),
    Error::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

/// Client-facing message; never includes backend error text.
fn public_message(err: &Error) -> String {
  match err {
    Error::Backend(_) => "internal storage error".to_owned(),
    Error::Ingestion(inner) => format!("failed to store JSON data: {}", public_message(inner)),
    other => other.to_string(),
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, kind, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, ErrorKind::Validation, m.clone()),
      ApiError::Core(e) => {
        if status_of(e).is_server_error() && !e.is_retryable() {
          tracing::error!(error = %e, "request failed");
        }
        (status_of(e), e.kind(), public_message(e))
      }
    };

    let mut res = (status, Json(json!({ "error": message, "kind": kind }))).into_response();
    if status == StatusCode::SERVICE_UNAVAILABLE {
      res
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn status(err: Error) -> StatusCode { ApiError::from(err).into_response().status() }

  #[test]
  fn statuses_by_kind() {
    assert_eq!(status(Error::Validation("x".into())), StatusCode::BAD_REQUEST);
    assert_eq!(status(Error::Authorization), StatusCode::FORBIDDEN);
    assert_eq!(
      status(QueryError::InvalidOperator("~".into()).into()),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(
      status(QueryError::TableNotFound("t".into()).into()),
      StatusCode::NOT_FOUND
    );
    assert_eq!(
      status(Error::Ingestion(Box::new(SchemaError::Conflict("dup".into()).into()))),
      StatusCode::CONFLICT
    );
    assert_eq!(
      status(Error::Ingestion(Box::new(Error::StorageBusy))),
      StatusCode::SERVICE_UNAVAILABLE
    );
  }

  #[test]
  fn busy_sets_retry_after() {
    let res = ApiError::from(Error::StorageBusy).into_response();
    assert_eq!(res.headers().get(header::RETRY_AFTER).unwrap(), "1");
  }

  #[test]
  fn backend_text_is_hidden() {
    let err = Error::backend(std::io::Error::other("no such table: secret_internal"));
    assert_eq!(public_message(&err), "internal storage error");
    let wrapped = Error::Ingestion(Box::new(err));
    assert!(!public_message(&wrapped).contains("secret_internal"));
  }
}
