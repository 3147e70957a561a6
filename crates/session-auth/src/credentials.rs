//! Credential storage for the session's access/refresh pair
//!
//! Keeps the pair in memory and mirrors it to a JSON key-value file so the
//! session survives restarts. All writes use atomic temp-file + rename to
//! prevent corruption on crash. A tokio Mutex serializes writers; the pair is
//! always updated in a single critical section, so readers see both new
//! values or both old ones, never a mix.
//!
//! Values cross the store boundary only through `encode_entry` and
//! `decode_entry`, so whatever a previous writer left in the file, callers get
//! canonical bearer strings or `None`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use common::Secret;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::canonical::{decode_entry, encode_entry};
use crate::constants::{DEFAULT_ACCESS_KEY, DEFAULT_REFRESH_KEY};
use crate::error::{Error, Result};

/// Which half of the credential pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Access,
    Refresh,
}

/// Storage keys for the two credential entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub access: String,
    pub refresh: String,
}

impl StorageKeys {
    fn key(&self, kind: CredentialKind) -> &str {
        match kind {
            CredentialKind::Access => &self.access,
            CredentialKind::Refresh => &self.refresh,
        }
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            access: DEFAULT_ACCESS_KEY.to_owned(),
            refresh: DEFAULT_REFRESH_KEY.to_owned(),
        }
    }
}

/// Snapshot of the session credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialPair {
    pub access: Option<Secret<String>>,
    pub refresh: Option<Secret<String>>,
}

impl CredentialPair {
    pub fn access(&self) -> Option<&str> {
        self.access.as_ref().map(Secret::as_str)
    }

    pub fn refresh(&self) -> Option<&str> {
        self.refresh.as_ref().map(Secret::as_str)
    }

    /// Neither credential is present.
    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }
}

/// Durable store for the session credential pair.
///
/// The file holds a flat JSON object; entries under keys other than the two
/// configured ones are preserved untouched. A store created with
/// `in_memory` never touches disk.
pub struct CredentialStore {
    path: Option<PathBuf>,
    keys: StorageKeys,
    state: Mutex<HashMap<String, String>>,
}

impl CredentialStore {
    /// Load credentials from the given file path.
    ///
    /// If the file doesn't exist, creates it as `{}` (signed-out start).
    pub async fn load(path: PathBuf, keys: StorageKeys) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            let entries: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
            info!(path = %path.display(), entries = entries.len(), "loaded credentials");
            entries
        } else {
            info!(path = %path.display(), "credential file not found, starting signed out");
            let entries = HashMap::new();
            write_atomic(&path, &entries).await?;
            entries
        };

        Ok(Self {
            path: Some(path),
            keys,
            state: Mutex::new(state),
        })
    }

    /// Store that keeps credentials in memory only.
    pub fn in_memory(keys: StorageKeys) -> Self {
        Self {
            path: None,
            keys,
            state: Mutex::new(HashMap::new()),
        }
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Canonical value for one credential, or `None`.
    pub async fn get(&self, kind: CredentialKind) -> Option<String> {
        let state = self.state.lock().await;
        decode_entry(state.get(self.keys.key(kind)).map(String::as_str))
    }

    /// Both credentials as a single snapshot.
    pub async fn pair(&self) -> CredentialPair {
        let state = self.state.lock().await;
        let read = |kind| {
            decode_entry(state.get(self.keys.key(kind)).map(String::as_str)).map(Secret::new)
        };
        CredentialPair {
            access: read(CredentialKind::Access),
            refresh: read(CredentialKind::Refresh),
        }
    }

    /// Canonicalize and persist one credential.
    ///
    /// A value with no canonical form removes the entry.
    pub async fn set(&self, kind: CredentialKind, value: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        apply(&mut state, self.keys.key(kind), encode_entry(Some(value)));
        debug!(?kind, "stored credential");
        self.persist(&state).await
    }

    /// Store a new access credential and, when given, a new refresh credential.
    ///
    /// Leaves the existing refresh credential in place if `refresh` is `None`.
    pub async fn set_pair(&self, access: &str, refresh: Option<&str>) -> Result<()> {
        let mut state = self.state.lock().await;
        apply(&mut state, &self.keys.access, encode_entry(Some(access)));
        if let Some(refresh) = refresh {
            apply(&mut state, &self.keys.refresh, encode_entry(Some(refresh)));
        }
        debug!(rotated_refresh = refresh.is_some(), "stored credential pair");
        self.persist(&state).await
    }

    /// Replace the whole pair, as on a fresh login.
    ///
    /// Unlike `set_pair`, a missing `refresh` removes any stored one.
    pub async fn replace(&self, access: &str, refresh: Option<&str>) -> Result<()> {
        let mut state = self.state.lock().await;
        apply(&mut state, &self.keys.access, encode_entry(Some(access)));
        apply(&mut state, &self.keys.refresh, encode_entry(refresh));
        debug!(has_refresh = refresh.is_some(), "replaced credential pair");
        self.persist(&state).await
    }

    /// Remove both credentials.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let removed_access = state.remove(&self.keys.access).is_some();
        let removed_refresh = state.remove(&self.keys.refresh).is_some();
        debug!(removed_access, removed_refresh, "cleared credentials");
        self.persist(&state).await
    }

    async fn persist(&self, state: &HashMap<String, String>) -> Result<()> {
        match &self.path {
            Some(path) => write_atomic(path, state).await,
            None => Ok(()),
        }
    }
}

fn apply(state: &mut HashMap<String, String>, key: &str, value: Option<String>) {
    match value {
        Some(value) => {
            state.insert(key.to_owned(), value);
        }
        None => {
            state.remove(key);
        }
    }
}

/// Write credentials to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets file permissions to 0600 (owner read/write only) since
/// the file contains bearer credentials.
async fn write_atomic(path: &Path, data: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing credentials: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("credential path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".credentials.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}
