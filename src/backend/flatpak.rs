use anyhow::{Context, Result};
use std::process::Command;

use super::PackageCatalog;
use crate::types::InstalledPackage;

/// Installed Flatpak applications, in the order `flatpak list` prints them.
pub struct Flatpak;

fn parse_list(text: &str) -> Vec<InstalledPackage> {
    text.lines()
        .filter_map(|line| {
            let (name, app_id) = line.split_once('\t')?;
            let (name, app_id) = (name.trim(), app_id.trim());
            if name.is_empty() || app_id.is_empty() {
                return None;
            }
            Some(InstalledPackage {
                display_name: name.to_string(),
                family_identity: app_id.to_string(),
            })
        })
        .collect()
}

impl PackageCatalog for Flatpak {
    fn installed_packages(&self) -> Result<Vec<InstalledPackage>> {
        let output = Command::new("flatpak")
            .args(["list", "--app", "--columns=name,application"])
            .output()
            .context("spawn flatpak")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!("flatpak list failed: {stderr}"));
        }
        Ok(parse_list(&String::from_utf8_lossy(&output.stdout)))
    }
}
