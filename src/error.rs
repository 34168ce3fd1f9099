use std::{fmt, path::PathBuf};

use crate::types::AppKey;

/// A key that more than one live window normalizes to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DuplicateKey {
    pub key: AppKey,
    pub titles: Vec<String>,
}

impl fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.key, self.titles.join(", "))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "multiple windows share an application key, close the extra windows first: {}",
        join_duplicates(.0)
    )]
    DuplicateWindowIdentity(Vec<DuplicateKey>),
    #[error("failed to read {}: {source}", path.display())]
    StorageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode {}: {source}", path.display())]
    StorageEncode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    StorageParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn join_duplicates(duplicates: &[DuplicateKey]) -> String {
    duplicates
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why a single snapshot entry could not be restored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LaunchFailure {
    #[error("no saved position")]
    NoSavedPosition,
    #[error("no launch identity")]
    NoLaunchIdentity,
    #[error("activation failed: {0}")]
    ActivationFailed(String),
    #[error("window lookup failed: {0}")]
    WindowLookup(String),
    #[error("window did not appear within {0} ms")]
    WindowNeverAppeared(u128),
    #[error("move/resize failed: {0}")]
    MoveFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
