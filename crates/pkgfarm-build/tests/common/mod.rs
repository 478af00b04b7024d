//! Shared helpers for build integration tests
//!
//! [`MockRuntime`] stands in for the container runtime: it records every
//! call, can be told to fail or delay specific images and containers, and
//! writes a marker file into the read-write mount of each successful run.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pkgfarm_build::{BuildContext, BuildSettings, ShutdownManager};
use pkgfarm_docker::{
    ContainerRuntime, ContainerSpec, DockerError, ImageBuildSpec, OutputSink,
};
use tempfile::TempDir;
use tokio::sync::Notify;
use tokio::time::{sleep, timeout};

/// Exit code reported for a killed container
pub const KILLED_EXIT_CODE: i64 = 137;

#[derive(Default)]
pub struct MockRuntime {
    operations: Mutex<Vec<String>>,
    build_failures: Mutex<HashSet<String>>,
    launch_failures: Mutex<HashSet<String>>,
    exit_codes: Mutex<HashMap<String, i64>>,
    delays: Mutex<HashMap<String, Duration>>,
    run_specs: Mutex<Vec<ContainerSpec>>,
    kill_signals: Mutex<HashMap<String, Arc<Notify>>>,
    blocking: bool,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl MockRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Containers run until they are killed
    pub fn blocking() -> Arc<Self> {
        Arc::new(Self { blocking: true, ..Self::default() })
    }

    pub fn fail_build(&self, image: &str) {
        self.build_failures.lock().unwrap().insert(image.to_string());
    }

    pub fn fail_launch(&self, container: &str) {
        self.launch_failures.lock().unwrap().insert(container.to_string());
    }

    pub fn set_exit_code(&self, container: &str, exit_code: i64) {
        self.exit_codes.lock().unwrap().insert(container.to_string(), exit_code);
    }

    pub fn set_delay(&self, container: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(container.to_string(), delay);
    }

    pub fn operations(&self) -> Vec<String> {
        self.operations.lock().unwrap().clone()
    }

    pub fn run_specs(&self) -> Vec<ContainerSpec> {
        self.run_specs.lock().unwrap().clone()
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Wait until `count` containers are running at once
    pub async fn wait_for_running(&self, count: usize) {
        timeout(Duration::from_secs(5), async {
            while self.running() < count {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("containers did not start in time");
    }

    fn record(&self, operation: String) {
        self.operations.lock().unwrap().push(operation);
    }

    fn kill_signal(&self, name: &str) -> Arc<Notify> {
        let mut signals = self.kill_signals.lock().unwrap();
        Arc::clone(signals.entry(name.to_string()).or_default())
    }
}

fn append_log(output: &OutputSink, line: &str) {
    if let Some(path) = output.path() {
        let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        writeln!(file, "{line}").unwrap();
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn build_image(
        &self,
        spec: &ImageBuildSpec,
        output: &OutputSink,
    ) -> pkgfarm_docker::Result<()> {
        self.record(format!("build:{}", spec.tag));
        append_log(output, &format!("build {}", spec.tag));

        if self.build_failures.lock().unwrap().contains(&spec.tag) {
            return Err(DockerError::BuildFailed {
                tag: spec.tag.clone(),
                reason: "mock build failure".to_string(),
            });
        }
        Ok(())
    }

    async fn run_container(
        &self,
        spec: &ContainerSpec,
        output: &OutputSink,
    ) -> pkgfarm_docker::Result<i64> {
        self.record(format!("run:{}", spec.name));
        self.run_specs.lock().unwrap().push(spec.clone());

        if self.launch_failures.lock().unwrap().contains(&spec.name) {
            return Err(DockerError::LaunchFailed {
                name: spec.name.clone(),
                reason: "mock launch failure".to_string(),
            });
        }

        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        append_log(output, &format!("run {}", spec.name));

        let exit_code = if self.blocking {
            self.kill_signal(&spec.name).notified().await;
            KILLED_EXIT_CODE
        } else {
            let delay = self.delays.lock().unwrap().get(&spec.name).copied();
            if let Some(delay) = delay {
                sleep(delay).await;
            }
            self.exit_codes.lock().unwrap().get(&spec.name).copied().unwrap_or(0)
        };

        if exit_code == 0 {
            if let Some(mount) = spec.volumes.iter().find(|v| !v.read_only) {
                let marker = mount.host_path.join(format!("{}.marker", spec.name));
                std::fs::write(marker, b"built").unwrap();
            }
        }

        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(exit_code)
    }

    async fn kill_container(&self, name: &str) -> pkgfarm_docker::Result<()> {
        self.record(format!("kill:{name}"));
        self.kill_signal(name).notify_one();
        Ok(())
    }
}

/// Settings for a throwaway source tree under `temp_dir`
pub fn settings(temp_dir: &TempDir, concurrency: usize) -> BuildSettings {
    let source_dir = temp_dir.path().join("src");
    std::fs::create_dir_all(&source_dir).unwrap();
    std::fs::write(source_dir.join("Dockerfile"), "ARG BASE_IMAGE\nFROM $BASE_IMAGE\n").unwrap();

    BuildSettings {
        dockerfile: source_dir.join("Dockerfile"),
        build_context: source_dir.clone(),
        source_dir,
        artifact_dir: temp_dir.path().join("out").join("artifacts"),
        image_repo: "pkgfarm-env".to_string(),
        concurrency,
        skip_tests: false,
        redirect_output: concurrency > 1,
    }
}

pub fn context(settings: BuildSettings, runtime: &Arc<MockRuntime>) -> Arc<BuildContext> {
    let runtime: Arc<dyn ContainerRuntime> = Arc::clone(runtime) as Arc<dyn ContainerRuntime>;
    Arc::new(BuildContext::with_shutdown(settings, runtime, Arc::new(ShutdownManager::new())))
}

pub fn marker(artifact_dir: &Path, container: &str) -> std::path::PathBuf {
    artifact_dir.join(format!("{container}.marker"))
}
