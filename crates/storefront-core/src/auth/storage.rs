use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};

use crate::config::StorageBackend;

/// Name of the durable record holding the token pair
pub const RECORD_NAME: &str = "auth-storage";

/// Keychain service name
const SERVICE_NAME: &str = "storefront";

/// The subset of authentication state that survives restarts.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedAuth {
    #[serde(rename = "accessToken")]
    pub access_token: Option<String>,
    #[serde(rename = "refreshToken")]
    pub refresh_token: Option<String>,
    #[serde(rename = "isAuthenticated")]
    pub is_authenticated: bool,
}

impl fmt::Debug for PersistedAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedAuth")
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("is_authenticated", &self.is_authenticated)
            .finish()
    }
}

/// Durable backend for [`PersistedAuth`].
pub trait AuthStorage: Send + Sync {
    fn load(&self) -> Result<Option<PersistedAuth>>;
    fn save(&self, record: &PersistedAuth) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Open the backend selected in the config.
pub fn open_storage(backend: StorageBackend, cache_dir: &Path) -> Box<dyn AuthStorage> {
    match backend {
        StorageBackend::File => Box::new(FileStorage::new(cache_dir.to_path_buf())),
        StorageBackend::Keyring => Box::new(KeyringStorage),
    }
}

/// Stores the record as `auth-storage.json` in the cache directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn record_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", RECORD_NAME))
    }
}

impl AuthStorage for FileStorage {
    fn load(&self) -> Result<Option<PersistedAuth>> {
        let path = self.record_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read auth storage file")?;
        let record = serde_json::from_str(&contents).context("Failed to parse auth storage file")?;
        Ok(Some(record))
    }

    fn save(&self, record: &PersistedAuth) -> Result<()> {
        std::fs::create_dir_all(&self.dir).context("Failed to create auth storage directory")?;
        let path = self.record_path();
        let contents = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, contents).context("Failed to write auth storage file")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to restrict auth storage file permissions")?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.record_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove auth storage file")?;
        }
        Ok(())
    }
}

/// Stores the record as JSON in the OS keychain.
pub struct KeyringStorage;

impl KeyringStorage {
    fn entry() -> Result<Entry> {
        Entry::new(SERVICE_NAME, RECORD_NAME).context("Failed to create keyring entry")
    }
}

impl AuthStorage for KeyringStorage {
    fn load(&self) -> Result<Option<PersistedAuth>> {
        match Self::entry()?.get_password() {
            Ok(json) => {
                let record = serde_json::from_str(&json)
                    .context("Failed to parse auth record from keychain")?;
                Ok(Some(record))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read auth record from keychain"),
        }
    }

    fn save(&self, record: &PersistedAuth) -> Result<()> {
        let json = serde_json::to_string(record)?;
        Self::entry()?
            .set_password(&json)
            .context("Failed to store auth record in keychain")
    }

    fn clear(&self) -> Result<()> {
        match Self::entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete auth record from keychain"),
        }
    }
}
