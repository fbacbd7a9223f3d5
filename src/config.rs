use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{Error, Result};

pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
const CONFIG_FILE: &str = "config.yaml";
const SOURCES_DIR: &str = "bbs_sources";
const LOCAL_DIR: &str = "local";
const CACHE_FILE: &str = "bbs_db.bin";
pub const LOG_FILE: &str = "bbs-dialer.log";

/// Platform directories everything else is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseDirs {
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl BaseDirs {
    pub fn from_platform() -> Result<Self> {
        let config_dir = dirs::config_dir().ok_or(Error::NoHomeDir)?;
        let cache_dir = dirs::cache_dir().ok_or(Error::NoHomeDir)?;
        Ok(Self {
            config_dir: config_dir.join(CRATE_NAME),
            cache_dir: cache_dir.join(CRATE_NAME),
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn log_file(&self) -> PathBuf {
        self.cache_dir.join(LOG_FILE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub source_dirs: Vec<PathBuf>,
    pub cache_file: PathBuf,
    /// Where entries created by this tool are written.
    pub local_entry_dir: PathBuf,
}

/// On-disk shape; every key may be left out.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    source_dirs: Option<Vec<PathBuf>>,
    #[serde(default)]
    cache_file: Option<PathBuf>,
    #[serde(default)]
    local_entry_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn defaults(base: &BaseDirs) -> Self {
        let source_dir = base.config_dir.join(SOURCES_DIR);
        Self {
            local_entry_dir: source_dir.join(LOCAL_DIR),
            source_dirs: vec![source_dir],
            cache_file: base.cache_dir.join(CACHE_FILE),
        }
    }

    /// Picks the config file (explicit override first, then the platform
    /// default) and loads it.
    pub fn resolve(config_override: Option<&Path>, base: &BaseDirs) -> Result<Self> {
        let path = config_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| base.config_file());
        Self::load(&path, base)
    }

    /// A missing file means defaults.
    pub fn load(path: &Path, base: &BaseDirs) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::defaults(base));
            }
            Err(e) => return Err(e.into()),
        };

        let raw: RawConfig = if contents.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|e| Error::Config {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        };

        // relative paths are taken from the config file's own directory
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let anchor = std::path::absolute(parent)?;
        let anchored = |p: PathBuf| if p.is_absolute() { p } else { anchor.join(p) };

        let defaults = Self::defaults(base);
        let source_dirs: Vec<PathBuf> = raw
            .source_dirs
            .map(|dirs| dirs.into_iter().map(anchored).collect())
            .unwrap_or(defaults.source_dirs);
        let local_entry_dir = raw.local_entry_dir.map(anchored).unwrap_or_else(|| {
            source_dirs
                .first()
                .map(|dir| dir.join(LOCAL_DIR))
                .unwrap_or(defaults.local_entry_dir)
        });

        let mut config = Self {
            source_dirs,
            cache_file: raw.cache_file.map(anchored).unwrap_or(defaults.cache_file),
            local_entry_dir,
        };
        config.cover_local_dir();
        Ok(config)
    }

    /// Makes sure entries written to the local dir are found by a scan.
    fn cover_local_dir(&mut self) {
        let covered = self
            .source_dirs
            .iter()
            .any(|dir| self.local_entry_dir.starts_with(dir));
        if !covered {
            warn!(
                local = %self.local_entry_dir.display(),
                "local entry directory is outside every source directory, scanning it too"
            );
            self.source_dirs.push(self.local_entry_dir.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(root: &Path) -> BaseDirs {
        BaseDirs {
            config_dir: root.join("config"),
            cache_dir: root.join("cache"),
        }
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let base = base(temp_dir.path());

        let config = AppConfig::resolve(None, &base).unwrap();

        assert_eq!(config, AppConfig::defaults(&base));
        assert!(config.local_entry_dir.starts_with(&config.source_dirs[0]));
        assert_eq!(config.cache_file, base.cache_dir.join("bbs_db.bin"));
    }

    #[test]
    fn test_override_path_is_used() {
        let temp_dir = tempfile::tempdir().unwrap();
        let base = base(temp_dir.path());
        let path = temp_dir.path().join("custom.yaml");
        let sources = temp_dir.path().join("boards");
        fs::write(
            &path,
            format!("source_dirs:\n  - {}\n", sources.display()),
        )
        .unwrap();

        let config = AppConfig::resolve(Some(&path), &base).unwrap();

        assert_eq!(config.source_dirs, vec![sources.clone()]);
        assert_eq!(config.local_entry_dir, sources.join("local"));
        assert_eq!(config.cache_file, base.cache_dir.join("bbs_db.bin"));
    }

    #[test]
    fn test_outside_local_dir_is_scanned() {
        let temp_dir = tempfile::tempdir().unwrap();
        let base = base(temp_dir.path());
        let path = temp_dir.path().join("config.yaml");
        let sources = temp_dir.path().join("shared");
        let local = temp_dir.path().join("mine");
        fs::write(
            &path,
            format!(
                "source_dirs: [{}]\nlocal_entry_dir: {}\ncache_file: {}\n",
                sources.display(),
                local.display(),
                temp_dir.path().join("c.bin").display()
            ),
        )
        .unwrap();

        let config = AppConfig::load(&path, &base).unwrap();

        assert_eq!(config.source_dirs, vec![sources, local]);
    }

    #[test]
    fn test_relative_paths_survive_a_restart() {
        let temp_dir = tempfile::tempdir().unwrap();
        let base = base(temp_dir.path());
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "source_dirs: [boards]\ncache_file: cache/bbs_db.bin\n").unwrap();

        let config = AppConfig::load(&path, &base).unwrap();
        assert_eq!(config.source_dirs, vec![temp_dir.path().join("boards")]);
        assert_eq!(config.local_entry_dir, temp_dir.path().join("boards").join("local"));
        assert_eq!(config.cache_file, temp_dir.path().join("cache").join("bbs_db.bin"));

        let first = crate::app::load_entries(&config).unwrap();
        assert!(first[0].source_path.is_absolute());
        let again = crate::app::load_entries(&config).unwrap();
        assert_eq!(again, first);
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "source_dirs: 7\n").unwrap();

        let err = AppConfig::load(&path, &base(temp_dir.path())).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
