//! # RocksDB Storage Adapter
//!
//! Persistent `KeyValueStore` for the overlay address book.
//!
//! - Snappy compression
//! - Bloom filters for point reads
//! - Lazy prefix iteration over a raw iterator

use std::path::Path;

use rocksdb::{BlockBasedOptions, DBCompressionType, Options, WriteOptions, DB};

use crate::ports::{KeyValueStore, KvIter, StorageError, StorageResult};

/// RocksDB configuration.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: String,
    /// Write buffer size in bytes (default: 16MB)
    pub write_buffer_size: usize,
    /// Enable fsync after each write (default: true for durability)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/overlay".to_string(),
            write_buffer_size: 16 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Create config for testing (small buffers, no sync)
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            write_buffer_size: 1024 * 1024,
            sync_writes: false,
        }
    }
}

/// RocksDB-backed address book store.
pub struct RocksDbStore {
    db: DB,
    config: RocksDbConfig,
}

impl RocksDbStore {
    /// Open or create a database.
    pub fn open(config: RocksDbConfig) -> StorageResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(DBCompressionType::Snappy);

        let mut block_opts = BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, &config.path)
            .map_err(|e| StorageError::Io(format!("failed to open RocksDB: {e}")))?;

        Ok(Self { db, config })
    }

    /// Open with default settings at `path`.
    pub fn open_default(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::open(RocksDbConfig {
            path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        })
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| StorageError::Io(format!("RocksDB get failed: {e}")))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        self.db
            .put_opt(key, value, &write_opts)
            .map_err(|e| StorageError::Io(format!("RocksDB put failed: {e}")))
    }

    fn delete(&self, key: &[u8]) -> StorageResult<()> {
        self.db
            .delete(key)
            .map_err(|e| StorageError::Io(format!("RocksDB delete failed: {e}")))
    }

    fn iterate(&self, prefix: &[u8]) -> KvIter<'_> {
        let mut raw = self.db.raw_iterator();
        raw.seek(prefix);
        let prefix = prefix.to_vec();
        let mut done = false;

        Box::new(std::iter::from_fn(move || {
            if done {
                return None;
            }
            if !raw.valid() {
                done = true;
                return raw
                    .status()
                    .err()
                    .map(|e| Err(StorageError::Io(format!("RocksDB scan failed: {e}"))));
            }
            let item = match (raw.key(), raw.value()) {
                (Some(key), Some(value)) if key.starts_with(&prefix) => {
                    (key.to_vec(), value.to_vec())
                }
                _ => {
                    done = true;
                    return None;
                }
            };
            raw.next();
            Some(Ok(item))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, RocksDbStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksDbStore::open(RocksDbConfig::for_testing(
            dir.path().to_string_lossy().to_string(),
        ))
        .unwrap();
        (dir, store)
    }

    #[test]
    fn test_put_get_delete() {
        let (_dir, store) = open_temp();

        store.put(b"node-a", b"addr-1").unwrap();
        store.put(b"node-a", b"addr-2").unwrap();
        assert_eq!(store.get(b"node-a").unwrap(), Some(b"addr-2".to_vec()));

        store.delete(b"node-a").unwrap();
        assert_eq!(store.get(b"node-a").unwrap(), None);
    }

    #[test]
    fn test_prefix_iteration_stops_at_prefix_end() {
        let (_dir, store) = open_temp();
        for key in [&b"aa"[..], b"ab", b"b0", b"ac"] {
            store.put(key, key).unwrap();
        }

        let keys: Vec<Vec<u8>> = store.iterate(b"a").map(|r| r.unwrap().0).collect();
        assert_eq!(keys, vec![b"aa".to_vec(), b"ab".to_vec(), b"ac".to_vec()]);
        assert_eq!(store.iterate(&[]).count(), 4);
    }
}
