use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::entry::{Entry, EntryRecord};
use crate::store::write_atomic;
use crate::{Error, Result};

/// Aggregated snapshot of every known entry, stored as one bincode file.
///
/// The cache is never authoritative: it can always be rebuilt from the
/// source directories.
#[derive(Debug, Clone)]
pub struct Cache {
    path: PathBuf,
}

impl Cache {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: PathBuf::from(path.as_ref()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last modification time, or `None` when there is no cache yet.
    pub fn modified(&self) -> Result<Option<SystemTime>> {
        match fs::metadata(&self.path) {
            Ok(meta) if meta.is_file() => Ok(Some(meta.modified()?)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Missing cache is a cold start, not an error.
    pub fn load(&self) -> Result<Vec<Entry>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let records: Vec<EntryRecord> =
            bincode::deserialize(&data).map_err(|e| self.corrupt(e.to_string()))?;

        records
            .into_iter()
            .map(|record| {
                Entry::decode(record, &self.path).map_err(|e| self.corrupt(e.to_string()))
            })
            .collect()
    }

    pub fn save(&self, entries: &[Entry]) -> Result<()> {
        let records: Vec<EntryRecord> = entries.iter().map(Entry::encode).collect();
        let data = bincode::serialize(&records).map_err(|e| self.corrupt(e.to_string()))?;
        write_atomic(&self.path, &data)?;
        debug!(path = %self.path.display(), count = entries.len(), "wrote cache");
        Ok(())
    }

    fn corrupt(&self, reason: String) -> Error {
        Error::CorruptCache {
            path: self.path.clone(),
            reason,
        }
    }
}
