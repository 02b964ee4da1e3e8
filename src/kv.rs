use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::{debug, warn};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::KvError;

/// String map persisted to a gzip-compressed bincode file.
///
/// Every change is written through to disk by replacing the whole file, so
/// readers see either the previous contents or the new ones. A store opened
/// with [`KvStore::in_memory`] never touches the filesystem.
#[derive(Debug, Default)]
pub struct KvStore {
    path: Option<PathBuf>,
    entries: HashMap<String, String>,
}

impl KvStore {
    /// Loads the file at `path`, or starts empty if it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KvError> {
        let path = path.as_ref().to_path_buf();
        let entries: HashMap<String, String> = if path.exists() {
            let decoder = GzDecoder::new(File::open(&path)?);
            let mut reader = BufReader::new(decoder);
            deserialize_from(&mut reader)?
        } else {
            HashMap::new()
        };
        debug!("Opened {} with {} keys", path.display(), entries.len());

        Ok(KvStore {
            path: Some(path),
            entries,
        })
    }

    /// Like [`KvStore::open`], but a file that no longer decodes is discarded
    /// and the store starts empty at the same path.
    pub fn open_or_reset(path: impl AsRef<Path>) -> Result<Self, KvError> {
        let path = path.as_ref();
        match KvStore::open(path) {
            Err(KvError::Codec(e)) => {
                warn!("Discarding unreadable {}: {}", path.display(), e);
                Ok(KvStore {
                    path: Some(path.to_path_buf()),
                    entries: HashMap::new(),
                })
            }
            other => other,
        }
    }

    pub fn in_memory() -> Self {
        KvStore::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<(), KvError> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    pub fn remove(&mut self, key: &str) -> Result<Option<String>, KvError> {
        let old = self.entries.remove(key);
        self.flush()?;
        Ok(old)
    }

    pub fn flush(&self) -> Result<(), KvError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        // Written next to the target and renamed over it once complete
        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let encoder = GzEncoder::new(tmp.as_file_mut(), Compression::default());
            let mut writer = BufWriter::new(encoder);
            serialize_into(&mut writer, &self.entries)?;

            let encoder = writer.into_inner().map_err(|e| e.into_error())?;
            encoder.finish()?.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}
