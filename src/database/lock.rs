use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use tokio::sync::{Mutex, OwnedMutexGuard};

static GLOBAL: LazyLock<Arc<ResourceLocks>> = LazyLock::new(|| Arc::new(ResourceLocks::new()));

/// One async mutex per snapshot path.
///
/// File-backed writers hold the guard for the whole load-mutate-save cycle so
/// two requests touching the same resource cannot overwrite each other.
#[derive(Debug, Default)]
pub struct ResourceLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every repository in the process.
    pub fn global() -> Arc<ResourceLocks> {
        GLOBAL.clone()
    }

    /// Waits until `path` is free and returns a guard that releases it on drop.
    pub async fn acquire(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
