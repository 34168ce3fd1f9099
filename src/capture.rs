//! Capture pipeline: selected keys to live windows to launch identity to store.

use anyhow::Result;
use log::{debug, info};
use std::collections::BTreeSet;

use crate::directory::{ensure_unique, WindowDirectory};
use crate::identity::IdentityResolver;
use crate::store::{Snapshot, SnapshotStore};
use crate::types::{AppKey, SnapshotEntry};

pub struct CaptureEngine<'a> {
    directory: WindowDirectory<'a>,
    resolver: IdentityResolver<'a>,
}

impl<'a> CaptureEngine<'a> {
    pub fn new(directory: WindowDirectory<'a>, resolver: IdentityResolver<'a>) -> Self {
        Self {
            directory,
            resolver,
        }
    }

    /// Build a snapshot of the selected keys from the live desktop.
    ///
    /// Keys without a live window are skipped. Fails with
    /// `DuplicateWindowIdentity` before touching anything if two live
    /// windows share a key.
    pub fn snapshot(&self, selected: &BTreeSet<AppKey>, saved: &BTreeSet<AppKey>) -> Result<Snapshot> {
        let live = self.directory.enumerate()?;
        ensure_unique(&live, saved)?;

        let packages = self.resolver.installed_packages();
        let mut entries = Vec::new();
        for key in selected {
            let Some(record) = live.iter().find(|record| &record.key == key) else {
                debug!("skipping {key}: no open window");
                continue;
            };
            let launch = self.resolver.resolve(record, &packages);
            debug!("captured {key} at {} ({launch:?})", record.rect);
            entries.push(SnapshotEntry {
                key: key.clone(),
                rect: record.rect,
                launch,
            });
        }
        Ok(Snapshot::from_entries(entries))
    }

    /// Capture and replace the persisted snapshot wholesale. Previously
    /// saved keys that are not selected again are dropped.
    pub fn capture(&self, selected: &BTreeSet<AppKey>, store: &mut SnapshotStore) -> Result<()> {
        let snapshot = self.snapshot(selected, &store.snapshot().keys())?;
        info!(
            "recorded {} of {} selected windows to {}",
            snapshot.len(),
            selected.len(),
            store.path().display()
        );
        store.replace(snapshot)?;
        Ok(())
    }
}
