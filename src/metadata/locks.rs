use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::metadata::error::MetadataError;

/// Mutual exclusion per coordinate path.
///
/// At most one rebuild-or-remove operation may touch the metadata of a given
/// coordinate path at a time; operations on disjoint paths proceed in
/// parallel. Acquisition is bounded: a caller that cannot get the lock within
/// the configured wait gets a `ConcurrencyConflict` it may retry.
pub struct PathLocks {
    max_wait: Duration,
    locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl PathLocks {
    pub fn new(max_wait: Duration) -> PathLocks {
        PathLocks {
            max_wait,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The returned guard is held through the caller's read-modify-write and
    /// released on every exit path when it drops.
    pub async fn acquire(&self, path: &Path) -> Result<OwnedMutexGuard<()>, MetadataError> {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            // an entry only the map still references has no holder and no
            // waiter, so it can go - the map must not grow with every path
            // ever touched
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        tokio::time::timeout(self.max_wait, lock.lock_owned())
            .await
            .map_err(|_| MetadataError::ConcurrencyConflict(path.to_path_buf()))
    }
}

impl Default for PathLocks {
    fn default() -> PathLocks {
        PathLocks::new(Duration::from_secs(10))
    }
}
