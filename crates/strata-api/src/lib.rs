//! JSON REST API for Strata.
//!
//! Exposes an axum [`Router`] backed by any [`strata_core::catalog::Backend`].
//! Every route reads the caller's key from `Authorization` and hands it to the
//! [`Gateway`], which decides whether the call is allowed.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v1", strata_api::api_router(gateway.clone()))
//! ```

pub mod auth;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod keys;
pub mod tables;

use axum::{
  Router,
  routing::{get, post},
};
use strata_core::{Gateway, catalog::Backend};

pub use error::ApiError;

/// Build a fully-materialised API router over `gateway`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(gateway: Gateway<S>) -> Router<()>
where
  S: Backend + 'static,
{
  Router::new()
    // Ingestion
    .route("/json", post(ingest::handler::<S>))
    // Catalog
    .route("/tables", get(tables::list::<S>))
    .route("/columns/{table}", get(tables::columns::<S>))
    // Queries
    .route("/filter", get(filter::search::<S>))
    .route("/filter_advanced", get(filter::compare::<S>))
    // Keys
    .route("/generate_api_key", post(keys::generate::<S>))
    .with_state(gateway)
}
