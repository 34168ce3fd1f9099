//! Bindings to the outside world: the window manager, process table,
//! package catalog and launcher. The engines only see these traits.

mod flatpak;
mod hyprland;
mod launch;
mod niri;
mod process;

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::types::{BackendKind, BackendWindow, InstalledPackage, MonitorRect, Rect, WindowHandle};

pub use flatpak::Flatpak;
pub use hyprland::Hyprland;
pub use launch::DesktopLauncher;
pub use niri::Niri;
pub use process::{ProcFs, ProcessLookupError};

pub trait WindowManager {
    /// Every top-level window, including ones with empty titles.
    fn list_windows(&self) -> Result<Vec<BackendWindow>>;

    fn move_resize(&self, handle: WindowHandle, rect: Rect) -> Result<()>;

    fn monitors(&self) -> Result<Vec<MonitorRect>>;
}

pub trait ProcessInspector {
    fn executable_path_of(&self, pid: u32) -> Result<PathBuf, ProcessLookupError>;
}

pub trait PackageCatalog {
    fn installed_packages(&self) -> Result<Vec<InstalledPackage>>;
}

/// Starts applications. Calls return once the process is spawned; they
/// never wait for it to exit.
pub trait Launcher {
    fn launch_executable(&self, path: &Path) -> Result<()>;

    fn launch_by_display_name(&self, name: &str) -> Result<()>;
}

pub fn window_manager(backend: BackendKind) -> Box<dyn WindowManager> {
    match backend {
        BackendKind::Niri => Box::new(Niri),
        BackendKind::Hyprland => Box::new(Hyprland),
    }
}
