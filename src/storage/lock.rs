//! Per-novel mutual exclusion for history read-modify-write cycles.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per novel id, created on first use.
#[derive(Debug, Default, Clone)]
pub struct NovelLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl NovelLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a novel, waiting while another task holds it.
    pub async fn lock(&self, novel_id: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().await;
            map.entry(novel_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }
}
