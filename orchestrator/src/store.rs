//! The durable record of the active deployment

use std::{
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::errors::OrchestratorError;

/// The deployment as written to disk
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedDeployment {
    /// The proxy contract
    #[serde(rename = "AssetTokenProxy")]
    pub proxy: Address,
    /// The implementation contract, absent in records written by older versions
    #[serde(
        rename = "AssetTokenImplementation",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub implementation: Option<Address>,
}

/// A single-slot store for the active deployment, backed by a JSON file
///
/// A bare address on a single line is also accepted when loading, and is read
/// as the proxy address with an unknown implementation.
#[derive(Clone, Debug)]
pub struct AddressStore {
    /// The path of the record
    path: PathBuf,
}

impl AddressStore {
    /// A store backed by the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path of the record
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the record is on disk
    pub fn exists(&self) -> Result<bool, OrchestratorError> {
        self.path.try_exists().map_err(|e| OrchestratorError::ReadStore(e.to_string()))
    }

    /// Read the record, returning `None` if there is none
    pub fn load(&self) -> Result<Option<PersistedDeployment>, OrchestratorError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(OrchestratorError::ReadStore(e.to_string())),
        };

        let contents = contents.trim();
        if contents.is_empty() {
            return Ok(None);
        }

        if let Ok(proxy) = Address::from_str(contents) {
            return Ok(Some(PersistedDeployment { proxy, implementation: None }));
        }

        serde_json::from_str(contents)
            .map(Some)
            .map_err(|e| OrchestratorError::ReadStore(e.to_string()))
    }

    /// Overwrite the record
    ///
    /// The record is written to a sibling file which is then renamed over the
    /// previous record, so readers never observe a partial write.
    pub fn save(&self, deployment: &PersistedDeployment) -> Result<(), OrchestratorError> {
        let persist_err = |e: String| OrchestratorError::Persist { reason: e, logs: String::new() };

        let json =
            serde_json::to_string_pretty(deployment).map_err(|e| persist_err(e.to_string()))?;

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, json).map_err(|e| persist_err(e.to_string()))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| persist_err(e.to_string()))
    }

    /// Delete the record, returning whether there was one
    pub fn clear(&self) -> Result<bool, OrchestratorError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => {
                Err(OrchestratorError::Persist { reason: e.to_string(), logs: String::new() })
            }
        }
    }

    /// The path written to before renaming over the record
    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use alloy::primitives::address;
    use tempfile::TempDir;

    use super::{AddressStore, PersistedDeployment};

    fn store_in(dir: &TempDir) -> AddressStore {
        AddressStore::new(dir.path().join("deployment.json"))
    }

    #[test]
    fn test_load_missing_record() {
        let dir = TempDir::new().unwrap();
        assert_eq!(store_in(&dir).load().unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let deployment = PersistedDeployment {
            proxy: address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"),
            implementation: Some(address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")),
        };

        store.save(&deployment).unwrap();

        // A fresh store over the same path sees the record
        assert_eq!(store_in(&dir).load().unwrap(), Some(deployment));
        assert!(!dir.path().join("deployment.json.tmp").exists());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let first = PersistedDeployment {
            proxy: address!("1111111111111111111111111111111111111111"),
            implementation: None,
        };
        let second = PersistedDeployment {
            proxy: address!("2222222222222222222222222222222222222222"),
            implementation: Some(address!("3333333333333333333333333333333333333333")),
        };

        store.save(&first).unwrap();
        store.save(&second).unwrap();

        assert_eq!(store.load().unwrap(), Some(second));
    }

    #[test]
    fn test_load_bare_address() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB\n").unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.proxy, address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"));
        assert_eq!(loaded.implementation, None);
    }

    #[test]
    fn test_load_corrupt_record() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{ not json").unwrap();

        assert!(store.load().is_err());
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let deployment = PersistedDeployment {
            proxy: address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"),
            implementation: None,
        };
        store.save(&deployment).unwrap();

        assert!(store.exists().unwrap());
        assert!(store.clear().unwrap());
        assert!(!store.clear().unwrap());
        assert!(!store.exists().unwrap());
        assert_eq!(store.load().unwrap(), None);
    }
}
