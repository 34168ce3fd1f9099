use anyhow::{Context, Result};
use std::{
    fs,
    os::unix::process::CommandExt,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    thread,
};

use super::Launcher;

/// Spawns executables directly and starts installed applications through
/// their desktop entry (`gtk-launch <desktop-id>`).
pub struct DesktopLauncher {
    application_dirs: Vec<PathBuf>,
}

impl DesktopLauncher {
    pub fn new() -> Self {
        Self::with_dirs(application_dirs())
    }

    pub fn with_dirs(application_dirs: Vec<PathBuf>) -> Self {
        Self { application_dirs }
    }

    /// Desktop-file id (file stem) of the first entry whose `Name=`
    /// contains `name`, ignoring case. Directories are searched in order,
    /// files within a directory by file name. Must stay in step with
    /// `identity::resolve_package_identity`.
    pub fn find_desktop_id(&self, name: &str) -> Option<String> {
        let wanted = name.to_lowercase();
        for base in &self.application_dirs {
            let Ok(entries) = fs::read_dir(base) else {
                continue;
            };
            let mut files: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("desktop"))
                .collect();
            files.sort();
            for file in files {
                if let Some(entry_name) = read_desktop_name(&file) {
                    if entry_name.to_lowercase().contains(&wanted) {
                        return file
                            .file_stem()
                            .and_then(|stem| stem.to_str())
                            .map(str::to_string);
                    }
                }
            }
        }
        None
    }
}

impl Launcher for DesktopLauncher {
    fn launch_executable(&self, path: &Path) -> Result<()> {
        let child = detached(Command::new(path))
            .spawn()
            .with_context(|| format!("spawn {}", path.display()))?;
        reap(child);
        Ok(())
    }

    fn launch_by_display_name(&self, name: &str) -> Result<()> {
        let desktop_id = self
            .find_desktop_id(name)
            .with_context(|| format!("no desktop entry named {name:?}"))?;
        let mut command = Command::new("gtk-launch");
        command.arg(&desktop_id);
        let child = detached(command)
            .spawn()
            .with_context(|| format!("spawn gtk-launch {desktop_id}"))?;
        reap(child);
        Ok(())
    }
}

fn detached(mut command: Command) -> Command {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    command.process_group(0);
    command
}

/// Waits for the child on a throwaway thread so it does not linger as a
/// zombie while the session keeps running.
fn reap(mut child: Child) {
    thread::spawn(move || {
        let _ = child.wait();
    });
}

fn application_dirs() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(data) = dirs::data_dir() {
        paths.push(data.join("applications"));
    }
    paths.push(PathBuf::from("/var/lib/flatpak/exports/share/applications"));
    if let Ok(xdg_dirs) = std::env::var("XDG_DATA_DIRS") {
        for dir in xdg_dirs.split(':') {
            if !dir.is_empty() {
                paths.push(PathBuf::from(dir).join("applications"));
            }
        }
    }
    paths.push(PathBuf::from("/usr/local/share/applications"));
    paths.push(PathBuf::from("/usr/share/applications"));
    paths.dedup();
    paths
}

fn read_desktop_name(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let mut in_entry = false;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            in_entry = line == "[Desktop Entry]";
            continue;
        }
        if !in_entry {
            continue;
        }
        if let Some(value) = line.strip_prefix("Name=") {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            return Some(value.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::resolve_package_identity;
    use crate::types::InstalledPackage;

    fn write_entry(dir: &Path, file: &str, body: &str) {
        fs::write(dir.join(file), body).unwrap();
    }

    #[test]
    fn finds_entry_by_name_ignoring_case() {
        let dir = tempfile::tempdir().unwrap();
        write_entry(
            dir.path(),
            "org.gnome.Calculator.desktop",
            "[Desktop Entry]\nName=Calculator\nExec=gnome-calculator\n",
        );
        write_entry(
            dir.path(),
            "notes.desktop",
            "# comment\n[Desktop Entry]\nName=Notes\n[Desktop Action new]\nName=New Note\n",
        );

        let launcher = DesktopLauncher::with_dirs(vec![dir.path().to_path_buf()]);
        assert_eq!(
            launcher.find_desktop_id("calculator").as_deref(),
            Some("org.gnome.Calculator")
        );
        assert_eq!(launcher.find_desktop_id("Notes").as_deref(), Some("notes"));
        assert_eq!(launcher.find_desktop_id("New Note"), None);
    }

    #[test]
    fn partial_name_match_relaunches_captured_package() {
        let dir = tempfile::tempdir().unwrap();
        write_entry(
            dir.path(),
            "org.gnome.Calculator.desktop",
            "[Desktop Entry]\nName=GNOME Calculator\nExec=gnome-calculator\n",
        );
        let packages = [InstalledPackage {
            display_name: "GNOME Calculator".to_string(),
            family_identity: "org.gnome.Calculator".to_string(),
        }];
        assert_eq!(
            resolve_package_identity("Calculator", &packages).as_deref(),
            Some("org.gnome.Calculator")
        );

        let launcher = DesktopLauncher::with_dirs(vec![dir.path().to_path_buf()]);
        assert_eq!(
            launcher.find_desktop_id("Calculator").as_deref(),
            Some("org.gnome.Calculator")
        );
    }

    #[test]
    fn first_partial_match_wins_in_scan_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_entry(first.path(), "b-notes.desktop", "[Desktop Entry]\nName=Sticky Notes\n");
        write_entry(first.path(), "a-notes.desktop", "[Desktop Entry]\nName=Notes Pro\n");
        write_entry(second.path(), "notes.desktop", "[Desktop Entry]\nName=Notes\n");

        let launcher =
            DesktopLauncher::with_dirs(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        assert_eq!(launcher.find_desktop_id("notes").as_deref(), Some("a-notes"));
    }

    #[test]
    fn ignores_names_outside_desktop_entry_group() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.desktop");
        fs::write(&path, "[Other]\nName=Wrong\n[Desktop Entry]\nName=Right\n").unwrap();
        assert_eq!(read_desktop_name(&path).as_deref(), Some("Right"));
    }

    #[test]
    fn launch_by_unknown_name_fails() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = DesktopLauncher::with_dirs(vec![dir.path().to_path_buf()]);
        assert!(launcher.launch_by_display_name("Nothing").is_err());
    }
}
