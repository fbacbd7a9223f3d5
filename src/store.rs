use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::entry::{Entry, RECORD_EXTENSION};
use crate::{Error, Result};

/// Anything that can produce the full entry set from the source directories.
pub trait EntrySource {
    fn load_all(&self, source_dirs: &[PathBuf]) -> Result<Vec<Entry>>;
}

/// One YAML file per entry, discovered recursively under each source dir.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntryStore;

impl EntrySource for EntryStore {
    fn load_all(&self, source_dirs: &[PathBuf]) -> Result<Vec<Entry>> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for dir in source_dirs {
            if !dir.is_dir() {
                debug!(dir = %dir.display(), "source directory missing, skipped");
                continue;
            }

            let pattern = format!(
                "{}/**/*.{RECORD_EXTENSION}",
                glob::Pattern::escape(&dir.to_string_lossy())
            );
            let paths = glob::glob(&pattern).map_err(|e| Error::Config {
                path: dir.clone(),
                reason: format!("cannot scan source directory: {e}"),
            })?;

            for path in paths {
                let path = path.map_err(glob::GlobError::into_error)?;
                // overlapping source dirs would otherwise yield duplicates
                if !path.is_file() || !seen.insert(path.clone()) {
                    continue;
                }
                entries.push(read_entry(&path)?);
            }
        }

        debug!(count = entries.len(), "loaded entries from source directories");
        Ok(entries)
    }
}

impl EntryStore {
    /// Writes the entry to its own file, replacing whatever was there.
    pub fn save(&self, entry: &Entry) -> Result<()> {
        write_atomic(&entry.source_path, entry.to_yaml()?.as_bytes())?;
        info!(id = %entry.id, path = %entry.source_path.display(), "saved entry");
        Ok(())
    }

    pub fn delete(&self, entry: &Entry) -> Result<()> {
        match fs::remove_file(&entry.source_path) {
            Ok(()) => {
                info!(id = %entry.id, path = %entry.source_path.display(), "deleted entry");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(Error::NotFound(entry.source_path.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn read_entry(path: &Path) -> Result<Entry> {
    let text = fs::read_to_string(path)?;
    let mut entry = Entry::from_yaml(&text, path)?;
    if entry.source_path != path {
        warn!(
            recorded = %entry.source_path.display(),
            actual = %path.display(),
            "entry file records a different source_path, using its actual location"
        );
        entry.source_path = path.to_path_buf();
    }
    Ok(entry)
}

/// Writes through a temporary file in the same directory and renames it
/// into place, so readers see either the old or the new contents.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        Some(_) => Path::new("."),
        None => {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no parent directory", path.display()),
            )))
        }
    };
    fs::create_dir_all(parent)?;

    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
