//! Works out how a captured window can be launched again.

use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::backend::{PackageCatalog, ProcessInspector};
use crate::config::CONTAINER_HOST;
use crate::types::{InstalledPackage, LaunchIdentity, WindowRecord};

pub fn is_container_host(path: &Path) -> bool {
    path.to_string_lossy().to_lowercase() == CONTAINER_HOST.to_lowercase()
}

/// First package whose display name contains `title`, ignoring case.
///
/// Several packages can match; the winner is whichever the package
/// manager listed first. That order is not guaranteed to be stable.
pub fn resolve_package_identity(title: &str, packages: &[InstalledPackage]) -> Option<String> {
    let needle = title.to_lowercase();
    packages
        .iter()
        .find(|package| package.display_name.to_lowercase().contains(&needle))
        .map(|package| package.family_identity.clone())
}

pub struct IdentityResolver<'a> {
    processes: &'a dyn ProcessInspector,
    catalog: &'a dyn PackageCatalog,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(processes: &'a dyn ProcessInspector, catalog: &'a dyn PackageCatalog) -> Self {
        Self { processes, catalog }
    }

    /// Queried fresh on every call; installs can change between captures.
    pub fn installed_packages(&self) -> Vec<InstalledPackage> {
        match self.catalog.installed_packages() {
            Ok(packages) => packages,
            Err(err) => {
                warn!("listing installed packages failed: {err:#}");
                Vec::new()
            }
        }
    }

    pub fn resolve_process_path(&self, window: &WindowRecord) -> Option<PathBuf> {
        let Some(pid) = window.pid else {
            debug!("no owning process reported for {:?}", window.raw_title);
            return None;
        };
        match self.processes.executable_path_of(pid) {
            Ok(path) => Some(path),
            Err(err) => {
                warn!("could not get executable path for {:?}: {err}", window.raw_title);
                None
            }
        }
    }

    pub fn resolve(&self, window: &WindowRecord, packages: &[InstalledPackage]) -> LaunchIdentity {
        let Some(path) = self.resolve_process_path(window) else {
            return LaunchIdentity::Unknown;
        };
        if !is_container_host(&path) {
            return LaunchIdentity::ExecutablePath(path);
        }
        match resolve_package_identity(window.key.as_str(), packages) {
            Some(identity) => LaunchIdentity::PackageIdentity(identity),
            None => {
                warn!("no installed package matches {:?}", window.raw_title);
                LaunchIdentity::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDesktop;
    use crate::directory::normalize_title;
    use crate::types::{Rect, WindowHandle};

    fn window(title: &str, pid: Option<u32>) -> WindowRecord {
        WindowRecord {
            key: normalize_title(title),
            raw_title: title.to_string(),
            handle: WindowHandle(1),
            rect: Rect::default(),
            pid,
        }
    }

    fn package(name: &str, id: &str) -> InstalledPackage {
        InstalledPackage {
            display_name: name.to_string(),
            family_identity: id.to_string(),
        }
    }

    #[test]
    fn container_host_match_ignores_case() {
        assert!(is_container_host(Path::new("/USR/BIN/BWRAP")));
        assert!(!is_container_host(Path::new("/usr/bin/bwrap2")));
    }

    #[test]
    fn package_match_is_case_insensitive_substring_first_wins() {
        let packages = vec![
            package("Mail Viewer", "org.example.MailViewer"),
            package("GNOME Calculator", "org.gnome.Calculator"),
            package("Calculator Plus", "org.example.CalcPlus"),
        ];
        assert_eq!(
            resolve_package_identity("calculator", &packages).as_deref(),
            Some("org.gnome.Calculator")
        );
        assert_eq!(resolve_package_identity("Weather", &packages), None);
    }

    #[test]
    fn regular_process_resolves_to_executable() {
        let desktop = FakeDesktop::new();
        desktop.set_exe(10, "/usr/bin/notes");
        let resolver = IdentityResolver::new(&desktop, &desktop);
        assert_eq!(
            resolver.resolve(&window("Notes", Some(10)), &[]),
            LaunchIdentity::ExecutablePath(PathBuf::from("/usr/bin/notes"))
        );
    }

    #[test]
    fn container_hosted_window_resolves_to_package() {
        let desktop = FakeDesktop::new();
        desktop.set_exe(20, CONTAINER_HOST);
        let resolver = IdentityResolver::new(&desktop, &desktop);
        let packages = vec![package("Calculator", "org.gnome.Calculator")];
        assert_eq!(
            resolver.resolve(&window("Calculator", Some(20)), &packages),
            LaunchIdentity::PackageIdentity("org.gnome.Calculator".into())
        );
        assert_eq!(
            resolver.resolve(&window("Unlisted", Some(20)), &packages),
            LaunchIdentity::Unknown
        );
    }

    #[test]
    fn lookup_failures_degrade_to_unknown() {
        let desktop = FakeDesktop::new();
        desktop.deny_access(30);
        let resolver = IdentityResolver::new(&desktop, &desktop);
        assert_eq!(resolver.resolve(&window("A", Some(30)), &[]), LaunchIdentity::Unknown);
        assert_eq!(resolver.resolve(&window("B", Some(31)), &[]), LaunchIdentity::Unknown);
        assert_eq!(resolver.resolve(&window("C", None), &[]), LaunchIdentity::Unknown);
    }

    #[test]
    fn broken_catalog_yields_empty_list() {
        let desktop = FakeDesktop::new();
        desktop.break_package_catalog();
        let resolver = IdentityResolver::new(&desktop, &desktop);
        assert!(resolver.installed_packages().is_empty());
    }
}
