// Registry of temporary files that a termination signal must not leave
// behind. The ctrl-c / SIGTERM handler removes every registered path and
// exits; volume mutations and in-flight platform calls are not rolled back.

use crate::constants::return_code;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct TempFileRegistry {
    paths: Arc<Mutex<Vec<PathBuf>>>,
}

impl TempFileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `path` until it is released.
    pub fn register(&self, path: &Path) {
        let mut paths = self.paths.lock();
        if !paths.iter().any(|p| p == path) {
            paths.push(path.to_path_buf());
        }
    }

    /// Stop tracking `path` (it was persisted or already removed).
    pub fn release(&self, path: &Path) {
        self.paths.lock().retain(|p| p != path);
    }

    pub fn registered(&self) -> Vec<PathBuf> {
        self.paths.lock().clone()
    }

    /// Remove every registered file that still exists. Returns how many
    /// were deleted.
    pub fn cleanup(&self) -> usize {
        let paths = std::mem::take(&mut *self.paths.lock());
        paths
            .iter()
            .filter(|p| p.exists() && std::fs::remove_file(p).is_ok())
            .count()
    }

    /// Install the process-wide SIGINT/SIGTERM handler.
    pub fn install_signal_handler(&self) -> anyhow::Result<()> {
        let registry = self.clone();
        ctrlc::set_handler(move || {
            let removed = registry.cleanup();
            tracing::warn!("Interrupted; removed {} temporary file(s)", removed);
            std::process::exit(return_code::INTERRUPTED);
        })?;
        Ok(())
    }
}
