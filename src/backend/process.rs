use log::debug;
use std::{io, path::PathBuf};

use super::ProcessInspector;
use crate::config::CONTAINER_HOST;

/// Present at the root of every Flatpak sandbox.
const FLATPAK_INFO: &str = ".flatpak-info";

#[derive(Debug, thiserror::Error)]
pub enum ProcessLookupError {
    #[error("process {0} not found")]
    NotFound(u32),
    #[error("access to process {0} denied")]
    AccessDenied(u32),
    #[error("process {pid}: {source}")]
    Other {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

/// Reads executable paths from procfs.
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    pub fn new() -> Self {
        Self::with_root(PathBuf::from("/proc"))
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }
}

impl ProcessInspector for ProcFs {
    /// A process inside a Flatpak sandbox reports the sandbox host rather
    /// than its in-sandbox binary, which does not exist on the host.
    fn executable_path_of(&self, pid: u32) -> Result<PathBuf, ProcessLookupError> {
        let process_dir = self.root.join(pid.to_string());
        let exe = std::fs::read_link(process_dir.join("exe")).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ProcessLookupError::NotFound(pid),
            io::ErrorKind::PermissionDenied => ProcessLookupError::AccessDenied(pid),
            _ => ProcessLookupError::Other { pid, source },
        })?;
        if process_dir.join("root").join(FLATPAK_INFO).is_file() {
            debug!("pid {pid} ({}) runs in a Flatpak sandbox", exe.display());
            return Ok(PathBuf::from(CONTAINER_HOST));
        }
        Ok(exe)
    }
}
