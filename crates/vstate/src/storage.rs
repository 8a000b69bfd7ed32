//! Record storage trait and implementations
//!
//! This is the authoritative off-chain copy of every committed record. The
//! commitment store never sees these bytes, only the root they hash into.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::{Result, StateError};

const LEAF_PREFIX: &str = "leaf:";

/// Storage key for the record committed at leaf `index`
pub fn leaf_key(index: u64) -> Vec<u8> {
    format!("{LEAF_PREFIX}{index:016x}").into_bytes()
}

/// Inverse of [`leaf_key`]; `None` for keys that are not leaf keys.
pub fn parse_leaf_key(key: &[u8]) -> Option<u64> {
    let key = std::str::from_utf8(key).ok()?;
    let hex = key.strip_prefix(LEAF_PREFIX)?;
    u64::from_str_radix(hex, 16).ok()
}

pub trait Storage: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;
    fn delete(&mut self, key: &[u8]) -> Result<()>;
    fn entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// In-memory storage (for testing and demos)
#[derive(Clone)]
pub struct InMemoryStorage {
    data: Arc<RwLock<HashMap<Vec<u8>, Vec<u8>>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<E>(_: E) -> StateError {
    StateError::Storage("storage lock poisoned".into())
}

impl Storage for InMemoryStorage {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let data = self.data.read().map_err(poisoned)?;
        Ok(data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut data = self.data.write().map_err(poisoned)?;
        data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        let mut data = self.data.write().map_err(poisoned)?;
        data.remove(key);
        Ok(())
    }

    fn entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let data = self.data.read().map_err(poisoned)?;
        Ok(data.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

/// JSON file of hex key -> hex value, rewritten on every mutation.
pub struct FileBackedStorage {
    path: PathBuf,
    data: BTreeMap<String, String>,
}

impl FileBackedStorage {
    /// Open `path`, loading its contents if the file exists.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            let bytes = std::fs::read(&path).map_err(|e| StateError::Storage(e.to_string()))?;
            serde_json::from_slice(&bytes).map_err(|e| StateError::Serialization(e.to_string()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.data)
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        // write-then-rename so a crash never leaves a torn file
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, bytes).map_err(|e| StateError::Storage(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StateError::Storage(e.to_string()))
    }
}

impl Storage for FileBackedStorage {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.data.get(&hex::encode(key)) {
            Some(v) => hex::decode(v)
                .map(Some)
                .map_err(|e| StateError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let k = hex::encode(key);
        let previous = self.data.insert(k.clone(), hex::encode(value));
        if let Err(e) = self.flush() {
            match previous {
                Some(v) => self.data.insert(k, v),
                None => self.data.remove(&k),
            };
            return Err(e);
        }
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        let k = hex::encode(key);
        if let Some(previous) = self.data.remove(&k) {
            if let Err(e) = self.flush() {
                self.data.insert(k, previous);
                return Err(e);
            }
        }
        Ok(())
    }

    fn entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.data
            .iter()
            .map(|(k, v)| {
                let key = hex::decode(k).map_err(|e| StateError::Serialization(e.to_string()))?;
                let value = hex::decode(v).map_err(|e| StateError::Serialization(e.to_string()))?;
                Ok((key, value))
            })
            .collect()
    }
}
