//! Durable session credentials.
//!
//! The gateway hands back opaque JSON blobs keyed by file name; we store
//! each one as `<name>.json` in a directory and replay them on the next
//! connection. Losing them after a `creds_update` means re-pairing, so
//! saves go through `sync_all` before returning.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::error::ClientError;

/// In-memory credential material, keyed by file name.
#[derive(Clone, Default)]
pub struct AuthState {
    files: HashMap<String, serde_json::Value>,
}

impl AuthState {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Look up one credential blob by name.
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.files.get(name)
    }

    pub fn insert(&mut self, name: String, blob: serde_json::Value) {
        self.files.insert(name, blob);
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.files.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        f.debug_struct("AuthState")
            .field("files", &names)
            .field("contents", &"[REDACTED]")
            .finish()
    }
}

/// Directory-backed store for `AuthState`.
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    /// Open a store rooted at `dir`, creating the directory if absent.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        if !dir.is_dir() {
            return Err(ClientError::CredentialDir(dir));
        }
        Ok(Self { dir })
    }

    /// Read every `*.json` file in the directory into an `AuthState`.
    ///
    /// A fresh directory yields an empty state, which the connection
    /// handshake treats as "unpaired".
    pub fn load(&self) -> Result<AuthState, ClientError> {
        let mut state = AuthState::default();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = fs::read_to_string(&path)?;
            let blob: serde_json::Value = serde_json::from_str(&content)?;
            state.insert(name.to_string(), blob);
        }
        Ok(state)
    }

    /// Persist a batch of credential files. Each file is fully written and
    /// fsynced before this returns; a crash afterwards must not lose
    /// pairing state.
    pub fn save(
        &self,
        files: &HashMap<String, serde_json::Value>,
    ) -> Result<(), ClientError> {
        for (name, blob) in files {
            if !is_safe_name(name) {
                return Err(ClientError::InvalidCredentialName(name.clone()));
            }
            let path = self.dir.join(format!("{name}.json"));
            let mut file = fs::File::create(&path)?;
            file.write_all(serde_json::to_string(blob)?.as_bytes())?;
            file.sync_all()?;
        }
        Ok(())
    }
}

/// Credential file names come from the wire; keep them flat.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
