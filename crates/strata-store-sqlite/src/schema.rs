//! Fixed SQL schema for the Strata SQLite store.
//!
//! Only the credential table is static; ingested tables are created at
//! runtime by the catalog.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS credentials (
    id               INTEGER PRIMARY KEY,
    token            TEXT    NOT NULL UNIQUE,
    read_permission  INTEGER NOT NULL,   -- 0 | 1
    write_permission INTEGER NOT NULL,   -- 0 | 1
    created_at       TEXT    NOT NULL    -- ISO 8601 UTC
);

PRAGMA user_version = 1;
";
