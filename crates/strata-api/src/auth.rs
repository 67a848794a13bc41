//! API key extraction from the `Authorization` header.
//!
//! The extractor never rejects: a missing key is passed on as `None` and the
//! [`Gateway`](strata_core::Gateway) turns it into a 403.

use std::convert::Infallible;

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};

/// The token presented by the caller, if any.
pub struct ApiKey(pub Option<String>);

impl ApiKey {
  pub fn as_deref(&self) -> Option<&str> { self.0.as_deref() }
}

/// Read the raw token from `Authorization`, accepting an optional `Bearer `
/// prefix.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
  let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
  (!token.is_empty()).then(|| token.to_owned())
}

impl<S: Send + Sync> FromRequestParts<S> for ApiKey {
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    Ok(ApiKey(token_from_headers(&parts.headers)))
  }
}
