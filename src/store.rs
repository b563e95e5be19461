//! Token record stores
//!
//! Records are keyed by `chain:address` and written at most once. Both
//! stores implement insert-if-absent: a second insert for the same key fails
//! with [`Error::DuplicateKey`] and leaves the first record untouched.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, info};

use crate::config::{StoreBackend, StoreConfig};
use crate::token::{Chain, TokenRecord, record_key};
use crate::{Error, Result};

/// Persistent home of analysed tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Look up the record for `(contract_address, chain)`.
    async fn find(&self, contract_address: &str, chain: Chain) -> Result<Option<TokenRecord>>;
    /// Store `record` unless its key is taken.
    async fn insert(&self, record: TokenRecord) -> Result<TokenRecord>;
}

/// Open the store selected by `config`
pub async fn open(config: &StoreConfig) -> Result<Arc<dyn TokenStore>> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory token store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::File => {
            let dir = config.resolved_directory();
            info!(directory = %dir.display(), "Using file token store");
            Ok(Arc::new(FileStore::new(dir).await?))
        }
    }
}

/// Thread-safe in-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, TokenRecord>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn find(&self, contract_address: &str, chain: Chain) -> Result<Option<TokenRecord>> {
        let key = record_key(contract_address, chain);
        Ok(self.entries.get(&key).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, record: TokenRecord) -> Result<TokenRecord> {
        match self.entries.entry(record.key()) {
            Entry::Occupied(entry) => Err(Error::DuplicateKey {
                key: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(record.clone());
                Ok(record)
            }
        }
    }
}

/// Store keeping one JSON document per token under a directory
pub struct FileStore {
    base_dir: PathBuf,
}

/// Disambiguates temp files written concurrently by one process
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

impl FileStore {
    /// Create a file store, creating `base_dir` if needed
    pub async fn new(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir).await.map_err(|e| {
            Error::Internal(format!(
                "Failed to create token store dir {}: {e}",
                base_dir.display()
            ))
        })?;
        Ok(Self { base_dir })
    }

    /// Directory holding the records
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// File name derived from the record key, safe for any address text
    fn record_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.base_dir.join(format!("{}.json", hex::encode(digest)))
    }

    fn temp_path(&self, final_path: &Path) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        final_path.with_extension(format!("{}.{n}.tmp", std::process::id()))
    }
}

#[async_trait]
impl TokenStore for FileStore {
    async fn find(&self, contract_address: &str, chain: Chain) -> Result<Option<TokenRecord>> {
        let key = record_key(contract_address, chain);
        let path = self.record_path(&key);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Io(e)),
        };

        let record: TokenRecord = serde_json::from_str(&content)?;
        if record.key() != key {
            return Err(Error::Internal(format!(
                "Token store file {} holds {} instead of {key}",
                path.display(),
                record.key()
            )));
        }
        Ok(Some(record))
    }

    async fn insert(&self, record: TokenRecord) -> Result<TokenRecord> {
        let key = record.key();
        let path = self.record_path(&key);
        let temp = self.temp_path(&path);

        fs::write(&temp, serde_json::to_vec_pretty(&record)?).await?;

        // hard_link refuses to replace an existing file, which gives
        // insert-if-absent without readers ever seeing a partial document
        let linked = fs::hard_link(&temp, &path).await;
        if let Err(e) = fs::remove_file(&temp).await {
            debug!(path = %temp.display(), error = %e, "Failed to remove temp file");
        }

        match linked {
            Ok(()) => {
                debug!(key = %key, path = %path.display(), "Stored token record");
                Ok(record)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(Error::DuplicateKey { key }),
            Err(e) => Err(Error::Io(e)),
        }
    }
}
