use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A record file could not be turned into an [`crate::Entry`].
    #[error("malformed entry in {}: {reason}", path.display())]
    MalformedEntry { path: PathBuf, reason: String },

    #[error("entry file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("no entry with id {0}")]
    UnknownEntry(uuid::Uuid),

    #[error("corrupt cache file {}: {reason}", path.display())]
    CorruptCache { path: PathBuf, reason: String },

    #[error("invalid config file {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("unable to locate the user config/cache directories")]
    NoHomeDir,

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    SubprocessFailure { program: String, status: ExitStatus },
}

impl Error {
    /// Launch-time failures are shown to the user and the session carries on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedScheme(_)
                | Error::InvalidAddress { .. }
                | Error::Spawn { .. }
                | Error::SubprocessFailure { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
