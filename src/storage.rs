//! Durable storage abstraction for index snapshots.
//!
//! Indexes persist themselves as opaque binary blobs keyed by name. The
//! [`Storage`] trait keeps the backends pluggable: [`FileStorage`] writes
//! under a root directory for production use, [`MemoryStorage`] keeps blobs
//! in a map for tests.
//!
//! Snapshots are framed with a small header (magic, format version, CRC32
//! of the payload) ahead of the bincode payload, so a truncated or
//! bit-flipped file surfaces as [`FathomError::CorruptSnapshot`] instead of
//! a silently wrong index.

use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{FathomError, Result};

/// Magic bytes identifying a fathom snapshot.
const SNAPSHOT_MAGIC: &[u8; 4] = b"FTHM";

/// Current snapshot format version.
const SNAPSHOT_VERSION: u32 = 1;

/// A trait for storage backends that store and retrieve named blobs.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Read the full contents of a named blob.
    ///
    /// Returns `Ok(None)` when no blob with that name exists.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Write a blob under the given name, replacing any previous contents.
    fn write(&self, name: &str, data: &[u8]) -> Result<()>;

    /// Check whether a blob with the given name exists.
    fn exists(&self, name: &str) -> bool;
}

/// Disk-backed storage rooted at a directory.
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a file storage rooted at `root`, creating the directory if
    /// needed.
    pub fn new<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Storage for FileStorage {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(path)?))
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        // Write to a temp name then rename, so a crash mid-write cannot
        // leave a half-written snapshot under the live name.
        let tmp = self.path_for(&format!("{name}.tmp"));
        fs::write(&tmp, data)?;
        fs::rename(&tmp, self.path_for(name))?;
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }
}

/// An in-memory storage implementation.
///
/// Useful for tests and temporary indexes; fast but non-persistent.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of blobs stored.
    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.files.lock().get(name).cloned())
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        self.files.lock().insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.files.lock().contains_key(name)
    }
}

/// Serialize `value` and write it as a framed snapshot blob.
pub fn write_snapshot<T: Serialize>(storage: &dyn Storage, name: &str, value: &T) -> Result<()> {
    let payload = bincode::serialize(value)
        .map_err(|e| FathomError::storage(format!("snapshot encode failed: {e}")))?;

    let mut framed = Vec::with_capacity(payload.len() + 12);
    framed.extend_from_slice(SNAPSHOT_MAGIC);
    framed
        .write_u32::<LittleEndian>(SNAPSHOT_VERSION)
        .map_err(FathomError::Io)?;
    framed
        .write_u32::<LittleEndian>(crc32fast::hash(&payload))
        .map_err(FathomError::Io)?;
    framed.extend_from_slice(&payload);

    storage.write(name, &framed)
}

/// Read and decode a framed snapshot blob.
///
/// Returns `Ok(None)` when no snapshot exists under `name`. A snapshot that
/// exists but fails magic, version, checksum, or decode checks returns
/// [`FathomError::CorruptSnapshot`].
pub fn read_snapshot<T: DeserializeOwned>(storage: &dyn Storage, name: &str) -> Result<Option<T>> {
    let Some(framed) = storage.read(name)? else {
        return Ok(None);
    };

    if framed.len() < 12 {
        return Err(FathomError::corrupt_snapshot(format!(
            "{name}: truncated header ({} bytes)",
            framed.len()
        )));
    }
    if &framed[0..4] != SNAPSHOT_MAGIC {
        return Err(FathomError::corrupt_snapshot(format!("{name}: bad magic")));
    }

    let mut cursor = Cursor::new(&framed[4..12]);
    let version = cursor.read_u32::<LittleEndian>().map_err(FathomError::Io)?;
    let checksum = cursor.read_u32::<LittleEndian>().map_err(FathomError::Io)?;

    if version != SNAPSHOT_VERSION {
        return Err(FathomError::corrupt_snapshot(format!(
            "{name}: unsupported version {version}"
        )));
    }

    let payload = &framed[12..];
    if crc32fast::hash(payload) != checksum {
        return Err(FathomError::corrupt_snapshot(format!(
            "{name}: checksum mismatch"
        )));
    }

    bincode::deserialize(payload)
        .map(Some)
        .map_err(|e| FathomError::corrupt_snapshot(format!("{name}: decode failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        ids: Vec<u64>,
        label: String,
    }

    fn sample() -> Sample {
        Sample {
            ids: vec![1, 2, 3],
            label: "snapshot".to_string(),
        }
    }

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert!(!storage.exists("a"));
        storage.write("a", b"hello").unwrap();
        assert!(storage.exists("a"));
        assert_eq!(storage.read("a").unwrap().unwrap(), b"hello");
        assert_eq!(storage.read("missing").unwrap(), None);
        assert_eq!(storage.file_count(), 1);
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage.write("idx.bin", b"data").unwrap();
        assert!(storage.exists("idx.bin"));
        assert_eq!(storage.read("idx.bin").unwrap().unwrap(), b"data");
        assert_eq!(storage.read("other.bin").unwrap(), None);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let storage = MemoryStorage::new();
        write_snapshot(&storage, "s", &sample()).unwrap();
        let back: Sample = read_snapshot(&storage, "s").unwrap().unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_snapshot_missing_is_none() {
        let storage = MemoryStorage::new();
        let back: Option<Sample> = read_snapshot(&storage, "nope").unwrap();
        assert!(back.is_none());
    }

    #[test]
    fn test_snapshot_detects_corruption() {
        let storage = MemoryStorage::new();
        write_snapshot(&storage, "s", &sample()).unwrap();

        // Flip one payload byte.
        let mut blob = storage.read("s").unwrap().unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xff;
        storage.write("s", &blob).unwrap();

        let result: Result<Option<Sample>> = read_snapshot(&storage, "s");
        assert!(matches!(result, Err(FathomError::CorruptSnapshot(_))));
    }

    #[test]
    fn test_snapshot_rejects_bad_magic() {
        let storage = MemoryStorage::new();
        storage.write("s", b"NOPE00000000and-some-payload").unwrap();
        let result: Result<Option<Sample>> = read_snapshot(&storage, "s");
        assert!(matches!(result, Err(FathomError::CorruptSnapshot(_))));
    }

    #[test]
    fn test_snapshot_rejects_truncated_blob() {
        let storage = MemoryStorage::new();
        storage.write("s", b"FTHM").unwrap();
        let result: Result<Option<Sample>> = read_snapshot(&storage, "s");
        assert!(matches!(result, Err(FathomError::CorruptSnapshot(_))));
    }
}
