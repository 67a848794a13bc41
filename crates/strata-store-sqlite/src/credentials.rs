//! [`CredentialStore`] for [`SqliteStore`].

use rusqlite::OptionalExtension as _;
use strata_core::{
  access::{Credential, PermissionSet},
  catalog::CredentialStore,
};

use crate::{
  Result,
  encode::{decode_dt, encode_dt},
  store::SqliteStore,
};

/// A `credentials` row as stored.
struct RawCredential {
  token:      String,
  read:       bool,
  write:      bool,
  created_at: String,
}

impl RawCredential {
  fn into_credential(self) -> Result<Credential> {
    Ok(Credential {
      token:       self.token,
      permissions: PermissionSet { read: self.read, write: self.write },
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

impl CredentialStore for SqliteStore {
  async fn find_credential<'a>(&'a self, token: &'a str) -> strata_core::Result<Option<Credential>> {
    let token = token.to_owned();
    let raw: Option<RawCredential> = self
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT token, read_permission, write_permission, created_at
               FROM credentials WHERE token = ?1",
              rusqlite::params![token],
              |row| {
                Ok(RawCredential {
                  token:      row.get(0)?,
                  read:       row.get(1)?,
                  write:      row.get(2)?,
                  created_at: row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    Ok(raw.map(RawCredential::into_credential).transpose()?)
  }

  async fn insert_credential<'a>(&'a self, credential: &'a Credential) -> strata_core::Result<()> {
    let token = credential.token.clone();
    let read = credential.permissions.read;
    let write = credential.permissions.write;
    let at_str = encode_dt(credential.created_at);

    self
      .call(move |conn| {
        conn.execute(
          "INSERT INTO credentials (token, read_permission, write_permission, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![token, read, write, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn count_credentials(&self) -> strata_core::Result<u64> {
    let count: i64 = self
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM credentials", [], |row| row.get(0))?))
      .await?;
    Ok(count as u64)
  }
}
