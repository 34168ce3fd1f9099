//! In-memory desktop used by the engine tests.

use anyhow::Result;
use std::{
    cell::RefCell,
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::backend::{Launcher, PackageCatalog, ProcessInspector, ProcessLookupError, WindowManager};
use crate::types::{BackendWindow, InstalledPackage, MonitorRect, Rect, WindowHandle};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Launch {
    Executable(PathBuf),
    DisplayName(String),
}

#[derive(Default)]
struct State {
    next_handle: u64,
    windows: Vec<BackendWindow>,
    monitors: Vec<MonitorRect>,
    exe_paths: HashMap<u32, PathBuf>,
    denied: Vec<u32>,
    packages: Option<Vec<InstalledPackage>>,
    launches: Vec<Launch>,
    moves: Vec<(WindowHandle, Rect)>,
    spawns_on_launch: Vec<(Launch, String, Rect)>,
    failing_launches: bool,
}

pub struct FakeDesktop {
    state: RefCell<State>,
}

impl FakeDesktop {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State {
                next_handle: 1,
                packages: Some(Vec::new()),
                ..State::default()
            }),
        }
    }

    pub fn open_window(&self, title: &str, rect: Rect, pid: Option<u32>) -> WindowHandle {
        let mut state = self.state.borrow_mut();
        let handle = WindowHandle(state.next_handle);
        state.next_handle += 1;
        state.windows.push(BackendWindow {
            handle,
            title: title.to_string(),
            rect,
            pid,
        });
        handle
    }

    pub fn set_exe(&self, pid: u32, path: &str) {
        self.state
            .borrow_mut()
            .exe_paths
            .insert(pid, PathBuf::from(path));
    }

    pub fn deny_access(&self, pid: u32) {
        self.state.borrow_mut().denied.push(pid);
    }

    pub fn add_package(&self, display_name: &str, family_identity: &str) {
        let mut state = self.state.borrow_mut();
        state
            .packages
            .get_or_insert_with(Vec::new)
            .push(InstalledPackage {
                display_name: display_name.to_string(),
                family_identity: family_identity.to_string(),
            });
    }

    pub fn break_package_catalog(&self) {
        self.state.borrow_mut().packages = None;
    }

    pub fn add_monitor(&self, x: i32, y: i32, width: i32, height: i32) {
        self.state.borrow_mut().monitors.push(MonitorRect {
            x,
            y,
            width,
            height,
        });
    }

    /// Launching `launch` opens a window titled `title` at `rect`.
    pub fn spawn_on_launch(&self, launch: Launch, title: &str, rect: Rect) {
        self.state
            .borrow_mut()
            .spawns_on_launch
            .push((launch, title.to_string(), rect));
    }

    pub fn fail_launches(&self) {
        self.state.borrow_mut().failing_launches = true;
    }

    pub fn launches(&self) -> Vec<Launch> {
        self.state.borrow().launches.clone()
    }

    pub fn moves(&self) -> Vec<(WindowHandle, Rect)> {
        self.state.borrow().moves.clone()
    }

    pub fn rect_of(&self, title: &str) -> Option<Rect> {
        self.state
            .borrow()
            .windows
            .iter()
            .find(|window| window.title == title)
            .map(|window| window.rect)
    }

    fn record_launch(&self, launch: Launch) -> Result<()> {
        if self.state.borrow().failing_launches {
            return Err(anyhow::anyhow!("launch refused"));
        }
        let spawned: Vec<(String, Rect)> = {
            let mut state = self.state.borrow_mut();
            state.launches.push(launch.clone());
            state
                .spawns_on_launch
                .iter()
                .filter(|(wanted, _, _)| *wanted == launch)
                .map(|(_, title, rect)| (title.clone(), *rect))
                .collect()
        };
        for (title, rect) in spawned {
            self.open_window(&title, rect, None);
        }
        Ok(())
    }
}

impl WindowManager for FakeDesktop {
    fn list_windows(&self) -> Result<Vec<BackendWindow>> {
        Ok(self.state.borrow().windows.clone())
    }

    fn move_resize(&self, handle: WindowHandle, rect: Rect) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.moves.push((handle, rect));
        let window = state
            .windows
            .iter_mut()
            .find(|window| window.handle == handle)
            .ok_or_else(|| anyhow::anyhow!("no window {}", handle.0))?;
        window.rect = rect;
        Ok(())
    }

    fn monitors(&self) -> Result<Vec<MonitorRect>> {
        Ok(self.state.borrow().monitors.clone())
    }
}

impl ProcessInspector for FakeDesktop {
    fn executable_path_of(&self, pid: u32) -> Result<PathBuf, ProcessLookupError> {
        let state = self.state.borrow();
        if state.denied.contains(&pid) {
            return Err(ProcessLookupError::AccessDenied(pid));
        }
        state
            .exe_paths
            .get(&pid)
            .cloned()
            .ok_or(ProcessLookupError::NotFound(pid))
    }
}

impl PackageCatalog for FakeDesktop {
    fn installed_packages(&self) -> Result<Vec<InstalledPackage>> {
        self.state
            .borrow()
            .packages
            .clone()
            .ok_or_else(|| anyhow::anyhow!("package manager unavailable"))
    }
}

impl Launcher for FakeDesktop {
    fn launch_executable(&self, path: &Path) -> Result<()> {
        self.record_launch(Launch::Executable(path.to_path_buf()))
    }

    fn launch_by_display_name(&self, name: &str) -> Result<()> {
        self.record_launch(Launch::DisplayName(name.to_string()))
    }
}
