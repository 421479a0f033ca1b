//! Representation bundle cache.
//!
//! Bundles are keyed by [`EncoderRepresentations::identifier`]. [`DiskCache`]
//! stores one bincode file per key, named by the SHA-256 of the key. Writes go
//! to a temporary file in the cache directory that is then renamed over the
//! target, so readers never observe a half-written bundle. There is no
//! cross-process lock; concurrent writers of one key are last-writer-wins.

use std::collections::HashMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::representations::EncoderRepresentations;

/// Cache failures.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No bundle stored under this key.
    #[error("No cached representations for '{key}'")]
    NotFound { key: String },

    /// A bundle exists and overwriting was not requested.
    #[error("Cached representations for '{key}' already exist at {path}")]
    AlreadyExists { key: String, path: PathBuf },

    /// The stored file does not hold the requested key.
    #[error("Cache entry {path} holds '{found}', expected '{key}'")]
    KeyMismatch {
        key: String,
        found: String,
        path: PathBuf,
    },

    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for CacheError {
    fn from(err: bincode::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

/// Persistence of representation bundles.
pub trait RepresentationCache: Send + Sync {
    /// Load the bundle stored under `key`.
    ///
    /// # Errors
    ///
    /// [`CacheError::NotFound`] on a miss.
    fn load(&self, key: &str) -> Result<EncoderRepresentations, CacheError>;

    /// Store `bundle` under its identifier.
    fn store(&self, bundle: &EncoderRepresentations, overwrite: bool) -> Result<(), CacheError>;
}

/// One bincode file per bundle under a directory.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `key`: `<dir>/<sha256(key)>.bin`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        self.dir.join(format!("{}.bin", hex::encode(hasher.finalize())))
    }
}

impl RepresentationCache for DiskCache {
    fn load(&self, key: &str) -> Result<EncoderRepresentations, CacheError> {
        let path = self.path_for(key);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheError::NotFound { key: key.to_string() })
            }
            Err(e) => return Err(e.into()),
        };
        let bundle: EncoderRepresentations = bincode::deserialize_from(BufReader::new(file))?;
        let found = bundle.identifier();
        if found != key {
            return Err(CacheError::KeyMismatch {
                key: key.to_string(),
                found,
                path,
            });
        }
        debug!(key, path = %path.display(), "Loaded cached representations");
        Ok(bundle)
    }

    fn store(&self, bundle: &EncoderRepresentations, overwrite: bool) -> Result<(), CacheError> {
        let key = bundle.identifier();
        let path = self.path_for(&key);
        if !overwrite && path.exists() {
            return Err(CacheError::AlreadyExists { key, path });
        }

        fs::create_dir_all(&self.dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            bincode::serialize_into(&mut writer, bundle)?;
            writer.flush()?;
        }
        tmp.persist(&path).map_err(|e| CacheError::Io(e.error))?;
        debug!(key = %key, path = %path.display(), "Stored representations");
        Ok(())
    }
}

/// Process-local cache, mostly for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, EncoderRepresentations>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RepresentationCache for MemoryCache {
    fn load(&self, key: &str) -> Result<EncoderRepresentations, CacheError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| CacheError::Serialization(format!("memory cache poisoned: {e}")))?;
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| CacheError::NotFound { key: key.to_string() })
    }

    fn store(&self, bundle: &EncoderRepresentations, overwrite: bool) -> Result<(), CacheError> {
        let key = bundle.identifier();
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| CacheError::Serialization(format!("memory cache poisoned: {e}")))?;
        if !overwrite && entries.contains_key(&key) {
            return Err(CacheError::AlreadyExists {
                key,
                path: PathBuf::from("<memory>"),
            });
        }
        entries.insert(key, bundle.clone());
        Ok(())
    }
}
