//! Persisted snapshot: one record per application key.
//!
//! The file is a JSON object keyed by application key. Each record carries
//! the rect plus the nullable `exe_path` / `pfn` pair; in memory that pair
//! becomes a [`LaunchIdentity`].

use log::info;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::error::{Error, Result};
use crate::types::{AppKey, LaunchIdentity, Rect, SnapshotEntry};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    left: i32,
    top: i32,
    width: i32,
    height: i32,
    #[serde(default)]
    exe_path: Option<String>,
    #[serde(default)]
    pfn: Option<String>,
}

impl From<&SnapshotEntry> for StoredRecord {
    fn from(entry: &SnapshotEntry) -> Self {
        let (exe_path, pfn) = match &entry.launch {
            LaunchIdentity::ExecutablePath(path) => (Some(path.to_string_lossy().into_owned()), None),
            LaunchIdentity::PackageIdentity(id) => (None, Some(id.clone())),
            LaunchIdentity::Unknown => (None, None),
        };
        Self {
            left: entry.rect.left,
            top: entry.rect.top,
            width: entry.rect.width,
            height: entry.rect.height,
            exe_path,
            pfn,
        }
    }
}

impl StoredRecord {
    fn into_entry(self, key: AppKey) -> SnapshotEntry {
        // A package identity wins if a hand-edited file carries both.
        let launch = match (self.pfn, self.exe_path) {
            (Some(pfn), _) if !pfn.is_empty() => LaunchIdentity::PackageIdentity(pfn),
            (_, Some(path)) if !path.is_empty() => LaunchIdentity::ExecutablePath(PathBuf::from(path)),
            _ => LaunchIdentity::Unknown,
        };
        SnapshotEntry {
            key,
            rect: Rect::new(self.left, self.top, self.width, self.height),
            launch,
        }
    }
}

/// Saved layout, iterated in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<AppKey, SnapshotEntry>,
}

impl Snapshot {
    pub fn from_entries(entries: impl IntoIterator<Item = SnapshotEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.key.clone(), entry))
                .collect(),
        }
    }

    pub fn get(&self, key: &AppKey) -> Option<&SnapshotEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &AppKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = &SnapshotEntry> {
        self.entries.values()
    }

    pub fn keys(&self) -> BTreeSet<AppKey> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn to_json(&self) -> serde_json::Result<String> {
        let records: BTreeMap<&str, StoredRecord> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.as_str(), StoredRecord::from(entry)))
            .collect();
        serde_json::to_string_pretty(&records)
    }

    fn from_json(text: &str) -> serde_json::Result<Self> {
        let records: BTreeMap<String, StoredRecord> = serde_json::from_str(text)?;
        Ok(Self {
            entries: records
                .into_iter()
                .map(|(key, record)| {
                    let key = AppKey::new(key);
                    (key.clone(), record.into_entry(key))
                })
                .collect(),
        })
    }
}

/// Owns the snapshot file and its in-memory copy. Only capture writes.
pub struct SnapshotStore {
    path: PathBuf,
    snapshot: Snapshot,
}

impl SnapshotStore {
    /// Loads the snapshot, first creating an empty file if none exists.
    pub fn open(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            info!("creating empty snapshot at {}", path.display());
            write_atomic(&path, "{}")?;
        }
        let text = fs::read_to_string(&path).map_err(|source| Error::StorageRead {
            path: path.clone(),
            source,
        })?;
        let snapshot = Snapshot::from_json(&text).map_err(|source| Error::StorageParse {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, snapshot })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Writes `snapshot` over the file and then swaps it in. On a write
    /// error the previous state stays in place.
    pub fn replace(&mut self, snapshot: Snapshot) -> Result<()> {
        let text = snapshot.to_json().map_err(|source| Error::StorageEncode {
            path: self.path.clone(),
            source,
        })?;
        write_atomic(&self.path, &text)?;
        self.snapshot = snapshot;
        Ok(())
    }
}

pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let write_err = |source| Error::StorageWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let mut file = fs::File::create(&tmp_path).map_err(write_err)?;
    file.write_all(contents.as_bytes()).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;
    fs::rename(&tmp_path, path).map_err(write_err)?;
    Ok(())
}
