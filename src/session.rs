//! Interactive session state: the current selection, the last window
//! listing and the saved snapshot, plus the overlay that previews them.

use anyhow::Result;
use log::debug;
use std::{collections::BTreeSet, time::Duration};

use crate::backend::{Launcher, PackageCatalog, ProcessInspector, WindowManager};
use crate::capture::CaptureEngine;
use crate::directory::{ensure_unique, merged_keys, WindowDirectory};
use crate::identity::IdentityResolver;
use crate::overlay::{OverlayRenderer, PreviewEntry};
use crate::restore::{RestoreEngine, RestoreReport};
use crate::store::SnapshotStore;
use crate::types::{AppKey, WindowRecord};

/// Everything the engines talk to.
#[derive(Clone, Copy)]
pub struct Desktop<'a> {
    pub wm: &'a dyn WindowManager,
    pub processes: &'a dyn ProcessInspector,
    pub catalog: &'a dyn PackageCatalog,
    pub launcher: &'a dyn Launcher,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingRow {
    pub key: AppKey,
    pub saved: bool,
    pub open: bool,
    pub selected: bool,
}

pub struct Session<'a> {
    desktop: Desktop<'a>,
    store: SnapshotStore,
    live: Vec<WindowRecord>,
    selection: BTreeSet<AppKey>,
    overlay: Option<Box<dyn OverlayRenderer + 'a>>,
}

impl<'a> Session<'a> {
    /// Starts with every saved key selected.
    pub fn new(desktop: Desktop<'a>, store: SnapshotStore) -> Self {
        let selection = store.snapshot().keys();
        Self {
            desktop,
            store,
            live: Vec::new(),
            selection,
            overlay: None,
        }
    }

    pub fn with_overlay(mut self, overlay: Box<dyn OverlayRenderer + 'a>) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn selection(&self) -> &BTreeSet<AppKey> {
        &self.selection
    }

    /// Re-read the open windows, refusing to go on if two of them share a
    /// key. Saved keys are selected again, as on startup.
    pub fn refresh(&mut self) -> Result<Vec<ListingRow>> {
        let live = WindowDirectory::new(self.desktop.wm).enumerate()?;
        let saved = self.store.snapshot().keys();
        ensure_unique(&live, &saved)?;
        self.live = live;
        self.selection.extend(saved);
        self.redraw_overlay()?;
        Ok(self.listing())
    }

    pub fn listing(&self) -> Vec<ListingRow> {
        let saved = self.store.snapshot().keys();
        merged_keys(&self.live, &saved)
            .into_iter()
            .map(|key| ListingRow {
                saved: saved.contains(&key),
                open: self.live.iter().any(|record| record.key == key),
                selected: self.selection.contains(&key),
                key,
            })
            .collect()
    }

    pub fn select(&mut self, key: AppKey) -> Result<bool> {
        if !self.is_known(&key) {
            return Err(anyhow::anyhow!("unknown application {key:?}"));
        }
        let changed = self.selection.insert(key);
        if changed {
            self.redraw_overlay()?;
        }
        Ok(changed)
    }

    /// Select exactly `keys`. Every key must be open or saved.
    pub fn replace_selection(&mut self, keys: BTreeSet<AppKey>) -> Result<()> {
        if let Some(unknown) = keys.iter().find(|key| !self.is_known(key)) {
            return Err(anyhow::anyhow!("unknown application {unknown:?}"));
        }
        if keys != self.selection {
            self.selection = keys;
            self.redraw_overlay()?;
        }
        Ok(())
    }

    pub fn deselect(&mut self, key: &AppKey) -> Result<bool> {
        let changed = self.selection.remove(key);
        if changed {
            self.redraw_overlay()?;
        }
        Ok(changed)
    }

    fn is_known(&self, key: &AppKey) -> bool {
        self.store.snapshot().contains(key) || self.live.iter().any(|record| &record.key == key)
    }

    /// Saved rects for selected saved keys, live rects for selected
    /// windows that have not been captured yet.
    pub fn preview_entries(&self) -> Vec<PreviewEntry> {
        self.selection
            .iter()
            .filter_map(|key| {
                let rect = match self.store.snapshot().get(key) {
                    Some(entry) => entry.rect,
                    None => self.live.iter().find(|record| &record.key == key)?.rect,
                };
                Some(PreviewEntry {
                    key: key.clone(),
                    rect,
                })
            })
            .collect()
    }

    pub fn redraw_overlay(&mut self) -> Result<()> {
        if self.overlay.is_none() {
            return Ok(());
        }
        let monitors = self.desktop.wm.monitors()?;
        let entries = self.preview_entries();
        debug!("rendering {} preview entries", entries.len());
        match self.overlay.as_mut() {
            Some(overlay) => overlay.render(&monitors, &entries),
            None => Ok(()),
        }
    }

    pub fn pump_overlay(&mut self) -> Result<()> {
        match self.overlay.as_mut() {
            Some(overlay) => overlay.pump(),
            None => Ok(()),
        }
    }

    pub fn close_overlay(&mut self) -> Result<()> {
        match self.overlay.as_mut() {
            Some(overlay) => overlay.clear(),
            None => Ok(()),
        }
    }

    /// Record the selected windows, replacing the saved snapshot.
    pub fn capture(&mut self) -> Result<()> {
        let engine = CaptureEngine::new(
            WindowDirectory::new(self.desktop.wm),
            IdentityResolver::new(self.desktop.processes, self.desktop.catalog),
        );
        engine.capture(&self.selection, &mut self.store)?;
        self.live = WindowDirectory::new(self.desktop.wm).enumerate()?;
        self.redraw_overlay()
    }

    /// Restore `keys`, or the whole snapshot when `keys` is `None`.
    pub fn restore(
        &mut self,
        keys: Option<&BTreeSet<AppKey>>,
        settle_interval: Duration,
        wait: &dyn Fn(Duration),
    ) -> Result<RestoreReport> {
        let engine = RestoreEngine::new(self.desktop.wm, self.desktop.launcher, settle_interval, wait);
        let snapshot = self.store.snapshot();
        match keys {
            Some(keys) => engine.restore_selected(snapshot, keys),
            None => engine.restore_all(snapshot),
        }
    }
}
