//! services/device_agent/src/file_store.rs
//!
//! A `CredentialStore` persisted as a single JSON object on disk. Every write
//! lands in a sibling temp file that is renamed over the original, so a crash
//! leaves either the old or the new contents and never a mix.

use async_trait::async_trait;
use guardiancare_core::{CredentialChange, CredentialKey, CredentialStore, PortError, PortResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct FileCredentialStore {
    path: PathBuf,
    cache: Mutex<HashMap<String, String>>,
}

impl FileCredentialStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> PortResult<Self> {
        let path = path.into();
        let cache = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<HashMap<String, String>>(&bytes).map_err(|e| {
                PortError::Unexpected(format!("Corrupt credential file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(io_error(&path, e)),
        };

        let unknown = cache
            .keys()
            .filter(|name| CredentialKey::from_name(name).is_none())
            .count();
        if unknown > 0 {
            warn!("Ignoring {} unknown field(s) in {}", unknown, path.display());
        }

        Ok(Self {
            path,
            cache: Mutex::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, contents: &HashMap<String, String>) -> PortResult<()> {
        let bytes = serde_json::to_vec_pretty(contents)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;
        debug!("Credentials persisted to {}", self.path.display());
        Ok(())
    }
}

fn io_error(path: &Path, e: std::io::Error) -> PortError {
    PortError::Unexpected(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self, key: CredentialKey) -> PortResult<Option<String>> {
        Ok(self.cache.lock().await.get(key.as_str()).cloned())
    }

    async fn write(&self, changes: &[CredentialChange]) -> PortResult<()> {
        let mut cache = self.cache.lock().await;
        let mut next = cache.clone();
        for (key, value) in changes {
            match value {
                Some(value) => next.insert(key.as_str().to_string(), value.clone()),
                None => next.remove(key.as_str()),
            };
        }
        // The cache only moves once the file has.
        self.persist(&next).await?;
        *cache = next;
        Ok(())
    }

    async fn clear(&self) -> PortResult<()> {
        let mut cache = self.cache.lock().await;
        let mut next = cache.clone();
        for key in CredentialKey::ALL {
            next.remove(key.as_str());
        }
        self.persist(&next).await?;
        *cache = next;
        Ok(())
    }
}
