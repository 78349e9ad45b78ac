//! Credential persistence
//!
//! The credential lives in two string entries, `token` and `expires`
//! (epoch seconds), in a small key-value store. [`FileStore`] keeps them
//! in a JSON file readable only by the owner; [`MemoryStore`] keeps them
//! in memory.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use htd_core::Credential;

/// Key holding the bearer token
pub const TOKEN_KEY: &str = "token";

/// Key holding the expiry, epoch seconds
pub const EXPIRES_KEY: &str = "expires";

/// Minimal string key-value persistence
pub trait KeyValueStore: Send {
    /// Read an entry
    fn get(&self, key: &str) -> Option<String>;

    /// Write an entry, replacing any previous value
    fn set(&mut self, key: &str, value: &str) -> io::Result<()>;

    /// Erase an entry; erasing a missing entry is not an error
    fn remove(&mut self, key: &str) -> io::Result<()>;
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// JSON file store.
///
/// The whole map is rewritten on every change. The file gets mode 0600 on
/// Unix. A missing or corrupt file reads as empty.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`, reading any existing entries
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable credential file {:?}: {}", path, e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!("Failed to read credential file {:?}: {}", path, e);
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> io::Result<()> {
        if self.entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e),
            };
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Owns the persisted credential
pub struct CredentialStore {
    backend: Box<dyn KeyValueStore>,
}

impl CredentialStore {
    /// Wrap a key-value backend
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Read the persisted credential.
    ///
    /// Never fails: absent or malformed entries give an empty token or a
    /// zero expiry, which is simply not valid.
    pub fn load(&self) -> Credential {
        let token = self.backend.get(TOKEN_KEY).unwrap_or_default();
        let expires_at = match self.backend.get(EXPIRES_KEY) {
            Some(raw) => raw.trim().parse::<i64>().unwrap_or_else(|_| {
                tracing::warn!("Persisted expiry {:?} is not a number", raw);
                0
            }),
            None => 0,
        };
        Credential::new(token, expires_at)
    }

    /// Persist a credential, overwriting both entries
    pub fn save(&mut self, credential: &Credential) -> io::Result<()> {
        self.backend.set(TOKEN_KEY, &credential.token)?;
        self.backend
            .set(EXPIRES_KEY, &credential.expires_at.to_string())
    }

    /// Erase both entries
    pub fn clear(&mut self) -> io::Result<()> {
        self.backend.remove(TOKEN_KEY)?;
        self.backend.remove(EXPIRES_KEY)
    }

    /// Whether `credential` is usable at `now`
    pub fn is_valid(credential: &Credential, now: i64) -> bool {
        credential.is_valid(now)
    }
}
