//! The container registry: the one shared mutable resource between the
//! Sandbox Executor and the Runtime Monitor.
//! Mutations are O(1) and guarded by a single mutex.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// A live sandbox, as seen by both the Executor and the Runtime Monitor.
#[derive(Debug, Clone)]
pub struct SandboxHandle {
    pub id: String,
    pub pid: Option<u32>,
    pub started_at: Instant,
    pub scratch_dir: PathBuf,
}

/// Shared, mutex-guarded table of live sandboxes.
///
/// Treated as soft state: on startup it is empty and reconstructed only from
/// what the Sandbox Executor itself provisions during this process's
/// lifetime.
#[derive(Debug, Default, Clone)]
pub struct SandboxRegistry {
    inner: Arc<Mutex<HashMap<String, SandboxHandle>>>,
}

impl SandboxRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: SandboxHandle) {
        self.inner.lock().expect("sandbox registry mutex poisoned").insert(handle.id.clone(), handle);
    }

    pub fn remove(&self, id: &str) -> Option<SandboxHandle> {
        self.inner.lock().expect("sandbox registry mutex poisoned").remove(id)
    }

    pub fn snapshot(&self) -> Vec<SandboxHandle> {
        self.inner.lock().expect("sandbox registry mutex poisoned").values().cloned().collect()
    }

    pub fn live_count(&self) -> usize {
        self.inner.lock().expect("sandbox registry mutex poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_remove_round_trip() {
        let registry = SandboxRegistry::new();
        registry.insert(SandboxHandle {
            id: "a".into(),
            pid: Some(1),
            started_at: Instant::now(),
            scratch_dir: PathBuf::from("/tmp/a"),
        });
        assert_eq!(registry.live_count(), 1);
        assert!(registry.remove("a").is_some());
        assert_eq!(registry.live_count(), 0);
    }
}
