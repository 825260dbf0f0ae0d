//! Persisted vault state: `<root>/<app>/data/vault.json`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{VaultError, VaultResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct VaultFile {
    #[serde(default)]
    vault_exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vault_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VaultStore {
    path: PathBuf,
    data: VaultFile,
}

impl VaultStore {
    pub fn load(root: &Path, app: &str) -> VaultResult<Self> {
        let path = vault_path(root, app);
        let data = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| VaultError::Storage(format!("vault read: {e}")))?;
            serde_json::from_str(&raw)
                .map_err(|e| VaultError::Storage(format!("vault json: {e}")))?
        } else {
            VaultFile::default()
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path { &self.path }
    pub fn exists(&self) -> bool { self.data.vault_exists }
    pub fn vault_id(&self) -> Option<&str> { self.data.vault_id.as_deref() }

    pub fn set_vault_id(&mut self, vault_id: &str) -> VaultResult<()> {
        let mut next = self.data.clone();
        next.vault_id = Some(vault_id.to_string());
        self.write(next)
    }

    pub fn mark_exists(&mut self) -> VaultResult<()> {
        let mut next = self.data.clone();
        next.vault_exists = true;
        self.write(next)
    }

    /// Drop the flag and the identifier together.
    pub fn clear(&mut self) -> VaultResult<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .map_err(|e| VaultError::Storage(format!("vault remove: {e}")))?;
        }
        self.data = VaultFile::default();
        Ok(())
    }

    fn write(&mut self, next: VaultFile) -> VaultResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| VaultError::Storage(format!("vault mkdir: {e}")))?;
        }
        let raw = serde_json::to_string_pretty(&next)
            .map_err(|e| VaultError::Storage(format!("vault json: {e}")))?;
        std::fs::write(&self.path, raw)
            .map_err(|e| VaultError::Storage(format!("vault write: {e}")))?;
        self.data = next;
        Ok(())
    }
}

/// `$MIMI_ROOT`, else the platform local data dir, else `.`.
pub fn default_root() -> PathBuf {
    std::env::var("MIMI_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")))
}

fn vault_path(root: &Path, app: &str) -> PathBuf {
    root.join(app).join("data").join("vault.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn fresh_root_has_no_vault() {
        let dir = TempDir::new().unwrap();
        let store = VaultStore::load(dir.path(), "test").unwrap();
        assert!(!store.exists());
        assert!(store.vault_id().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn persist_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut store = VaultStore::load(dir.path(), "test").unwrap();
        store.set_vault_id("1234 5678 9012").unwrap();
        assert!(!VaultStore::load(dir.path(), "test").unwrap().exists());

        store.mark_exists().unwrap();
        let reloaded = VaultStore::load(dir.path(), "test").unwrap();
        assert!(reloaded.exists());
        assert_eq!(reloaded.vault_id(), Some("1234 5678 9012"));

        let raw = std::fs::read_to_string(reloaded.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["vault_exists"], true);
    }

    #[test]
    fn clear_wipes_everything() {
        let dir = TempDir::new().unwrap();
        let mut store = VaultStore::load(dir.path(), "test").unwrap();
        store.set_vault_id("1234 5678 9012").unwrap();
        store.mark_exists().unwrap();
        store.clear().unwrap();
        assert!(!store.exists());
        assert!(!store.path().exists());
        assert!(VaultStore::load(dir.path(), "test").unwrap().vault_id().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test").join("data");
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("vault.json"), "{not json").unwrap();
        assert!(matches!(VaultStore::load(dir.path(), "test"), Err(VaultError::Storage(_))));
    }
}
