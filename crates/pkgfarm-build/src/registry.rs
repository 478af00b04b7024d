//! Tracking of running build containers

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use pkgfarm_docker::ContainerRuntime;
use tracing::{debug, info, warn};

/// Names of containers believed to be running.
///
/// A name is present from just before its launch until the job unregisters
/// it or a kill sweep processes it.
pub struct ContainerRegistry {
    active: Mutex<HashSet<String>>,
    runtime: Arc<dyn ContainerRuntime>,
}

impl ContainerRegistry {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { active: Mutex::new(HashSet::new()), runtime }
    }

    /// Record a container about to be launched
    pub fn register(&self, name: &str) {
        debug!("Registering container {}", name);
        self.active.lock().insert(name.to_string());
    }

    /// Forget a container; no-op if it is not tracked
    pub fn unregister(&self, name: &str) {
        if self.active.lock().remove(name) {
            debug!("Unregistered container {}", name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.active.lock().contains(name)
    }

    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.lock().is_empty()
    }

    /// Sorted snapshot of the tracked names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.active.lock().iter().cloned().collect();
        names.sort();
        names
    }

    /// Kill every container tracked when the sweep starts.
    ///
    /// The lock is only held to take the snapshot and to remove each name,
    /// never across a runtime call. Kill failures are logged and swallowed.
    /// Returns the number of containers swept.
    pub async fn kill_all(&self) -> usize {
        let snapshot = self.names();
        if snapshot.is_empty() {
            return 0;
        }

        info!("Killing {} running container(s)", snapshot.len());

        let kills = snapshot.iter().map(|name| async move {
            if let Err(e) = self.runtime.kill_container(name).await {
                warn!("Failed to kill container {}: {}", name, e);
            }
            self.active.lock().remove(name);
        });
        join_all(kills).await;

        snapshot.len()
    }
}

impl std::fmt::Debug for ContainerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerRegistry").field("active", &self.names()).finish()
    }
}
