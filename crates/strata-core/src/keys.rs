//! Minting of new API keys.

use chrono::Utc;
use rand_core::{OsRng, RngCore};

use crate::{
  Error, Result,
  access::{Credential, PermissionSet},
  catalog::CredentialStore,
};

/// Random bytes per token (128 bits).
const TOKEN_BYTES: usize = 16;

/// Generate a fresh hex-encoded token from the OS RNG.
pub fn generate_token() -> String {
  let mut buf = [0u8; TOKEN_BYTES];
  OsRng.fill_bytes(&mut buf);
  hex::encode(buf)
}

pub struct KeyIssuer<'a, S> {
  store: &'a S,
}

impl<'a, S: CredentialStore> KeyIssuer<'a, S> {
  pub fn new(store: &'a S) -> Self { Self { store } }

  /// Mint and persist a credential carrying `permissions`.
  pub async fn issue(&self, permissions: PermissionSet) -> Result<Credential> {
    if permissions.is_empty() {
      return Err(Error::Validation(
        "invalid permissions; choose 'read', 'write', or both".into(),
      ));
    }
    let credential = Credential {
      token: generate_token(),
      permissions,
      created_at: Utc::now(),
    };
    self.store.insert_credential(&credential).await?;
    tracing::info!(
      read = permissions.read,
      write = permissions.write,
      "api key issued"
    );
    Ok(credential)
  }

  /// Create the privileged first credential if the store has none.
  ///
  /// Uses `token` when given, otherwise generates one. Returns the new
  /// credential, or `None` if credentials already exist.
  pub async fn bootstrap(&self, token: Option<String>) -> Result<Option<Credential>> {
    if self.store.count_credentials().await? > 0 {
      return Ok(None);
    }
    let token = match token {
      Some(t) if t.trim().is_empty() => {
        return Err(Error::Validation("bootstrap token must not be blank".into()));
      }
      Some(t) => t,
      None => generate_token(),
    };
    let credential = Credential {
      token,
      permissions: PermissionSet::ALL,
      created_at: Utc::now(),
    };
    self.store.insert_credential(&credential).await?;
    Ok(Some(credential))
  }
}
