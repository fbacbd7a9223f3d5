use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::config::AppConfig;
use crate::entry::Entry;
use crate::store::EntrySource;
use crate::{Error, Result};

/// Decides whether the cache still mirrors the source directories.
///
/// Freshness is judged only by directory modification times: adding or
/// removing a file directly inside a source dir bumps it, an in-place edit
/// of a file (or a change in a nested subdirectory) may not. Such edits show
/// up after the next forced [`Reconciler::rebuild`].
pub struct Reconciler<'a, S> {
    source: &'a S,
    source_dirs: &'a [PathBuf],
    cache: Cache,
}

impl<'a, S: EntrySource> Reconciler<'a, S> {
    pub fn new(config: &'a AppConfig, source: &'a S) -> Self {
        Self {
            source,
            source_dirs: &config.source_dirs,
            cache: Cache::new(&config.cache_file),
        }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Newest mtime among the source dirs that exist, `UNIX_EPOCH` if none do.
    pub fn newest_dir_mtime(&self) -> Result<SystemTime> {
        let mut newest = SystemTime::UNIX_EPOCH;
        for dir in self.source_dirs {
            let modified = match fs::metadata(dir) {
                Ok(meta) if meta.is_dir() => meta.modified()?,
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            newest = newest.max(modified);
        }
        Ok(newest)
    }

    pub fn is_fresh(&self) -> Result<bool> {
        let Some(cache_mtime) = self.cache.modified()? else {
            return Ok(false);
        };
        Ok(self.newest_dir_mtime()? <= cache_mtime)
    }

    /// Returns the current entry set, rescanning only when the cache is stale.
    /// A non-empty `existing` set is trusted as-is while the cache is fresh.
    pub fn refresh(&self, existing: Vec<Entry>) -> Result<Vec<Entry>> {
        if !self.is_fresh()? {
            debug!(cache = %self.cache.path().display(), "cache stale or missing");
            return self.rebuild();
        }

        if !existing.is_empty() {
            return Ok(existing);
        }

        match self.cache.load() {
            Ok(entries) => {
                debug!(count = entries.len(), "cache fresh, using cached entries");
                Ok(entries)
            }
            Err(e @ Error::CorruptCache { .. }) => {
                warn!(error = %e, "discarding unreadable cache");
                self.rebuild()
            }
            Err(e) => Err(e),
        }
    }

    /// Unconditionally rescans the source dirs and rewrites the cache.
    pub fn rebuild(&self) -> Result<Vec<Entry>> {
        let entries = self.source.load_all(self.source_dirs)?;
        self.cache.save(&entries)?;
        info!(count = entries.len(), "rebuilt cache from source directories");
        Ok(entries)
    }
}
