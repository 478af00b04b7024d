//! Build context shared by every worker

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use pkgfarm_config::Config;
use pkgfarm_core::Target;
use pkgfarm_docker::ContainerRuntime;

use crate::artifact::ArtifactDirectory;
use crate::graceful_shutdown::ShutdownManager;
use crate::registry::ContainerRegistry;

/// Resolved settings for one run
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Source tree, mounted read-only at `/src`
    pub source_dir: PathBuf,
    /// Shared output directory, mounted read-write at `/artifacts`
    pub artifact_dir: PathBuf,
    /// Dockerfile for the environment images
    pub dockerfile: PathBuf,
    /// Context directory for the image build
    pub build_context: PathBuf,
    /// Repository part of the environment image references
    pub image_repo: String,
    /// Worker pool width
    pub concurrency: usize,
    /// Set `DEB_BUILD_OPTIONS=nocheck` in every job
    pub skip_tests: bool,
    /// Write runtime output to `<tag>.buildlog` instead of the terminal
    pub redirect_output: bool,
}

impl BuildSettings {
    /// Derive settings from a resolved configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            source_dir: config.source_dir.clone(),
            artifact_dir: config.artifact_dir(),
            dockerfile: config.dockerfile(),
            build_context: config.build_context(),
            image_repo: config.image_repo.clone(),
            concurrency: config.jobs.max(1),
            skip_tests: config.skip_tests,
            redirect_output: config.redirect_output(),
        }
    }

    /// Environment image reference for a target
    pub fn image_for(&self, target: &Target) -> String {
        format!("{}:{}", self.image_repo, target.tag())
    }
}

/// Fail-fast gate: set once, never cleared
#[derive(Debug, Default)]
pub struct FailureFlag {
    tripped: AtomicBool,
    first: Mutex<Option<Target>>,
}

impl FailureFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any job has failed or the run was interrupted
    pub fn is_set(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    /// Record a failing target. Returns true if it is the first failure.
    pub fn record(&self, target: &Target) -> bool {
        let mut first = self.first.lock();
        self.tripped.store(true, Ordering::Release);
        if first.is_none() {
            *first = Some(target.clone());
            true
        } else {
            false
        }
    }

    /// Set the flag without attributing a target
    pub fn trip(&self) {
        self.tripped.store(true, Ordering::Release);
    }

    /// First target recorded as failed
    pub fn first_target(&self) -> Option<Target> {
        self.first.lock().clone()
    }
}

/// Everything a build worker needs, shared by `Arc`
pub struct BuildContext {
    settings: BuildSettings,
    runtime: Arc<dyn ContainerRuntime>,
    registry: ContainerRegistry,
    failure: FailureFlag,
    artifacts: ArtifactDirectory,
    shutdown: Arc<ShutdownManager>,
}

impl BuildContext {
    /// Create a context with its own shutdown manager
    pub fn new(settings: BuildSettings, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self::with_shutdown(settings, runtime, Arc::new(ShutdownManager::new()))
    }

    /// Create a context bound to an existing shutdown manager
    pub fn with_shutdown(
        settings: BuildSettings,
        runtime: Arc<dyn ContainerRuntime>,
        shutdown: Arc<ShutdownManager>,
    ) -> Self {
        let artifacts = ArtifactDirectory::new(&settings.artifact_dir);
        let registry = ContainerRegistry::new(Arc::clone(&runtime));
        Self { settings, runtime, registry, failure: FailureFlag::new(), artifacts, shutdown }
    }

    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    pub fn registry(&self) -> &ContainerRegistry {
        &self.registry
    }

    pub fn failure(&self) -> &FailureFlag {
        &self.failure
    }

    pub fn artifacts(&self) -> &ArtifactDirectory {
        &self.artifacts
    }

    pub fn shutdown(&self) -> &Arc<ShutdownManager> {
        &self.shutdown
    }

    /// Check if shutdown was requested
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.is_shutdown_requested()
    }
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("settings", &self.settings)
            .field("active_containers", &self.registry.len())
            .field("failed", &self.failure.is_set())
            .finish()
    }
}
