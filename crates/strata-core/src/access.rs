//! Credentials, permissions, and the authorization check.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, catalog::CredentialStore};

// ─── Permissions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
  Read,
  Write,
}

impl fmt::Display for Permission {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Permission::Read => "read",
      Permission::Write => "write",
    })
  }
}

impl FromStr for Permission {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "read" => Ok(Permission::Read),
      "write" => Ok(Permission::Write),
      other => Err(Error::Validation(format!(
        "invalid permission {other:?}; choose 'read', 'write', or both"
      ))),
    }
  }
}

/// The set of permissions carried by a credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionSet {
  pub read:  bool,
  pub write: bool,
}

impl PermissionSet {
  pub const ALL: Self = Self { read: true, write: true };

  pub fn is_empty(&self) -> bool { !self.read && !self.write }

  pub fn contains(&self, permission: Permission) -> bool {
    match permission {
      Permission::Read => self.read,
      Permission::Write => self.write,
    }
  }

  pub fn insert(&mut self, permission: Permission) {
    match permission {
      Permission::Read => self.read = true,
      Permission::Write => self.write = true,
    }
  }

  /// The permissions in a stable order (`read` before `write`).
  pub fn to_vec(self) -> Vec<Permission> {
    [Permission::Read, Permission::Write]
      .into_iter()
      .filter(|p| self.contains(*p))
      .collect()
  }
}

impl FromIterator<Permission> for PermissionSet {
  fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
    let mut set = Self::default();
    for p in iter {
      set.insert(p);
    }
    set
  }
}

/// Parse a comma-separated list such as `"read,write"`.
impl FromStr for PermissionSet {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    s.split(',')
      .map(str::trim)
      .filter(|p| !p.is_empty())
      .map(Permission::from_str)
      .collect()
  }
}

// ─── Credential ──────────────────────────────────────────────────────────────

/// An API key and the permissions it grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
  pub token:       String,
  #[serde(serialize_with = "serialize_permissions")]
  pub permissions: PermissionSet,
  pub created_at:  DateTime<Utc>,
}

fn serialize_permissions<S: serde::Serializer>(
  set: &PermissionSet,
  serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
  serializer.collect_seq(set.to_vec())
}

impl Credential {
  pub fn allows(&self, permission: Permission) -> bool {
    self.permissions.contains(permission)
  }
}

// ─── Access control ──────────────────────────────────────────────────────────

/// Gate placed in front of every read and write operation.
pub struct AccessControl<'a, S> {
  store: &'a S,
}

impl<'a, S: CredentialStore> AccessControl<'a, S> {
  pub fn new(store: &'a S) -> Self { Self { store } }

  /// `true` only if `token` names a credential carrying `permission`.
  ///
  /// A missing or empty token is refused without consulting the store.
  pub async fn authorize(&self, token: Option<&str>, permission: Permission) -> Result<bool> {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
      return Ok(false);
    };
    let credential = self.store.find_credential(token).await?;
    Ok(credential.is_some_and(|c| c.allows(permission)))
  }

  /// Like [`authorize`](Self::authorize) but fails with
  /// [`Error::Authorization`] instead of returning `false`.
  pub async fn require(&self, token: Option<&str>, permission: Permission) -> Result<()> {
    if self.authorize(token, permission).await? {
      Ok(())
    } else {
      tracing::debug!(%permission, "authorization refused");
      Err(Error::Authorization)
    }
  }
}
