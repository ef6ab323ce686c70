//! crates/guardiancare_core/src/store.rs
//!
//! An in-process `CredentialStore`. Nothing survives a restart; the device
//! agent ships a file-backed store for that.

use crate::ports::{CredentialChange, CredentialKey, CredentialStore, PortResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    fields: RwLock<HashMap<CredentialKey, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields currently held.
    pub fn len(&self) -> usize {
        self.fields.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.read().is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, key: CredentialKey) -> PortResult<Option<String>> {
        Ok(self.fields.read().get(&key).cloned())
    }

    async fn write(&self, changes: &[CredentialChange]) -> PortResult<()> {
        // A single write lock covers the whole batch.
        let mut fields = self.fields.write();
        for (key, value) in changes {
            match value {
                Some(value) => {
                    fields.insert(*key, value.clone());
                }
                None => {
                    fields.remove(key);
                }
            }
        }
        Ok(())
    }

    async fn clear(&self) -> PortResult<()> {
        self.fields.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_sets_and_removes_in_one_batch() {
        let store = MemoryCredentialStore::new();
        store
            .write(&[
                (CredentialKey::UserId, Some("u1".into())),
                (CredentialKey::ElderlyId, Some("e1".into())),
            ])
            .await
            .unwrap();

        store
            .write(&[
                (CredentialKey::UserId, Some("u2".into())),
                (CredentialKey::ElderlyId, None),
            ])
            .await
            .unwrap();

        assert_eq!(store.get(CredentialKey::UserId).await.unwrap().as_deref(), Some("u2"));
        assert_eq!(store.get(CredentialKey::ElderlyId).await.unwrap(), None);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn clear_drops_every_field() {
        let store = MemoryCredentialStore::new();
        let changes: Vec<CredentialChange> = CredentialKey::ALL
            .into_iter()
            .map(|key| (key, Some(key.as_str().to_string())))
            .collect();
        store.write(&changes).await.unwrap();
        assert_eq!(store.len(), CredentialKey::ALL.len());

        store.clear().await.unwrap();
        assert!(store.is_empty());
    }
}
