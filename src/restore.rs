//! Restore pipeline: reposition open windows, launch missing ones.
//!
//! Each entry walks `Idle → Located → Positioned` when its window is open,
//! or `Idle → Launching → WaitingForWindow → Located → Positioned` when it
//! has to be started. Any step may end in `Failed`. After a launch there is
//! exactly one settle wait and one re-check; a slow application fails its
//! entry rather than being polled again.

use anyhow::Result;
use log::{debug, info, warn};
use std::{collections::BTreeSet, fmt, time::Duration};

use crate::backend::{Launcher, WindowManager};
use crate::directory::{ensure_unique, WindowDirectory};
use crate::error::LaunchFailure;
use crate::store::Snapshot;
use crate::types::{AppKey, LaunchIdentity, SnapshotEntry, WindowRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Restored {
    AlreadyOpen,
    Launched,
}

#[derive(Debug)]
enum Phase {
    Idle,
    Located(WindowRecord, Restored),
    Launching,
    WaitingForWindow,
    Positioned(Restored),
    Failed(LaunchFailure),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryOutcome {
    pub key: AppKey,
    pub result: Result<Restored, LaunchFailure>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub outcomes: Vec<EntryOutcome>,
}

impl RestoreReport {
    pub fn failures(&self) -> impl Iterator<Item = (&AppKey, &LaunchFailure)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err().map(|err| (&outcome.key, err)))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

impl fmt::Display for RestoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let restored = self.outcomes.len() - self.failures().count();
        write!(f, "restored {restored} of {}", self.outcomes.len())?;
        for (key, err) in self.failures() {
            write!(f, "\n  {key}: {err}")?;
        }
        Ok(())
    }
}

pub struct RestoreEngine<'a> {
    wm: &'a dyn WindowManager,
    launcher: &'a dyn Launcher,
    settle_interval: Duration,
    wait: &'a dyn Fn(Duration),
}

impl<'a> RestoreEngine<'a> {
    pub fn new(
        wm: &'a dyn WindowManager,
        launcher: &'a dyn Launcher,
        settle_interval: Duration,
        wait: &'a dyn Fn(Duration),
    ) -> Self {
        Self {
            wm,
            launcher,
            settle_interval,
            wait,
        }
    }

    fn directory(&self) -> WindowDirectory<'a> {
        WindowDirectory::new(self.wm)
    }

    /// Restore every saved entry in key order.
    pub fn restore_all(&self, snapshot: &Snapshot) -> Result<RestoreReport> {
        self.check_unique(snapshot)?;
        let outcomes = snapshot
            .entries()
            .map(|entry| self.outcome(entry))
            .collect();
        Ok(RestoreReport { outcomes })
    }

    /// Restore only `selected`; selected keys with no saved entry are
    /// reported as failures.
    pub fn restore_selected(
        &self,
        snapshot: &Snapshot,
        selected: &BTreeSet<AppKey>,
    ) -> Result<RestoreReport> {
        self.check_unique(snapshot)?;
        let outcomes = selected
            .iter()
            .map(|key| match snapshot.get(key) {
                Some(entry) => self.outcome(entry),
                None => {
                    warn!("no saved position for {key}");
                    EntryOutcome {
                        key: key.clone(),
                        result: Err(LaunchFailure::NoSavedPosition),
                    }
                }
            })
            .collect();
        Ok(RestoreReport { outcomes })
    }

    fn check_unique(&self, snapshot: &Snapshot) -> Result<()> {
        let live = self.directory().enumerate()?;
        ensure_unique(&live, &snapshot.keys())?;
        Ok(())
    }

    fn outcome(&self, entry: &SnapshotEntry) -> EntryOutcome {
        let result = self.restore(entry);
        match &result {
            Ok(how) => info!("{}: positioned at {} ({how:?})", entry.key, entry.rect),
            Err(err) => warn!("{}: {err}", entry.key),
        }
        EntryOutcome {
            key: entry.key.clone(),
            result,
        }
    }

    pub fn restore(&self, entry: &SnapshotEntry) -> Result<Restored, LaunchFailure> {
        let mut phase = Phase::Idle;
        loop {
            debug!("{}: {phase:?}", entry.key);
            phase = match phase {
                Phase::Idle => match self.locate(&entry.key) {
                    Ok(Some(record)) => Phase::Located(record, Restored::AlreadyOpen),
                    Ok(None) => Phase::Launching,
                    Err(failure) => Phase::Failed(failure),
                },
                Phase::Launching => match self.launch(entry) {
                    Ok(()) => Phase::WaitingForWindow,
                    Err(failure) => Phase::Failed(failure),
                },
                Phase::WaitingForWindow => {
                    (self.wait)(self.settle_interval);
                    match self.locate(&entry.key) {
                        Ok(Some(record)) => Phase::Located(record, Restored::Launched),
                        Ok(None) => Phase::Failed(LaunchFailure::WindowNeverAppeared(
                            self.settle_interval.as_millis(),
                        )),
                        Err(failure) => Phase::Failed(failure),
                    }
                }
                Phase::Located(record, how) => match self.wm.move_resize(record.handle, entry.rect) {
                    Ok(()) => Phase::Positioned(how),
                    Err(err) => Phase::Failed(LaunchFailure::MoveFailed(format!("{err:#}"))),
                },
                Phase::Positioned(how) => return Ok(how),
                Phase::Failed(failure) => return Err(failure),
            };
        }
    }

    fn locate(&self, key: &AppKey) -> Result<Option<WindowRecord>, LaunchFailure> {
        self.directory()
            .find(key)
            .map_err(|err| LaunchFailure::WindowLookup(format!("{err:#}")))
    }

    fn launch(&self, entry: &SnapshotEntry) -> Result<(), LaunchFailure> {
        let launched = match &entry.launch {
            // Sandboxed apps start through their desktop entry, found by name.
            LaunchIdentity::PackageIdentity(_) => {
                self.launcher.launch_by_display_name(entry.key.as_str())
            }
            LaunchIdentity::ExecutablePath(path) => self.launcher.launch_executable(path),
            LaunchIdentity::Unknown => return Err(LaunchFailure::NoLaunchIdentity),
        };
        launched.map_err(|err| LaunchFailure::ActivationFailed(format!("{err:#}")))
    }
}
