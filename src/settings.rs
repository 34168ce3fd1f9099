use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::error::{Error, Result};
use crate::store::write_atomic;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Ask before restoring the saved layout.
    #[serde(default)]
    pub confirm_start: bool,
}

pub struct SettingsStore {
    path: PathBuf,
    data: Settings,
}

impl SettingsStore {
    /// Missing or unreadable settings fall back to the defaults.
    pub fn load(path: PathBuf) -> Self {
        let data = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("ignoring malformed settings in {}: {err}", path.display());
                Settings::default()
            }),
            Err(_) => Settings::default(),
        };
        Self { path, data }
    }

    pub fn settings(&self) -> &Settings {
        &self.data
    }

    pub fn update(&mut self, settings: Settings) -> Result<()> {
        let serialized =
            serde_json::to_string_pretty(&settings).map_err(|source| Error::StorageEncode {
                path: self.path.clone(),
                source,
            })?;
        write_atomic(&self.path, &serialized)?;
        info!("settings saved: {settings:?}");
        self.data = settings;
        Ok(())
    }
}
