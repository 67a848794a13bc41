//! Core types and trait definitions for the Strata ingestion engine.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement the traits in [`catalog`]; the outer layers talk to a
//! backend through [`Gateway`], which puts [`access::AccessControl`] in front
//! of every operation.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
#![allow(async_fn_in_trait)]

pub mod access;
pub mod catalog;
pub mod column;
pub mod error;
pub mod gateway;
pub mod ident;
pub mod ingest;
pub mod keys;
pub mod query;

pub use error::{Error, ErrorKind, QueryError, Result, SchemaError};
pub use gateway::Gateway;

/// One JSON object of an ingested batch.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// A positional result row, ordered like the table's columns.
pub type Row = Vec<serde_json::Value>;

#[cfg(test)]
mod testing;
