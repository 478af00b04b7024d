//! Container runtime driven through the `docker` command line

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::container::ContainerSpec;
use crate::error::{DockerError, Result};
use crate::image::ImageBuildSpec;
use crate::output::OutputSink;
use crate::service::ContainerRuntime;

/// Exit code reported when the runtime process died from a signal
pub const SIGNALED_EXIT_CODE: i64 = -1;

/// Runtime executable configuration
#[derive(Debug, Clone)]
pub struct DockerConfig {
    /// Executable name or path (`docker`, `podman`, ...)
    pub binary: String,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self { binary: "docker".to_string() }
    }
}

/// [`ContainerRuntime`] backed by the docker CLI
#[derive(Debug, Clone)]
pub struct DockerCli {
    config: DockerConfig,
}

impl DockerCli {
    /// Create a new CLI driver
    pub fn new(config: DockerConfig) -> Self {
        Self { config }
    }

    /// Executable in use
    pub fn binary(&self) -> &str {
        &self.config.binary
    }

    fn command(&self, args: &[String]) -> Command {
        let mut command = Command::new(&self.config.binary);
        command.args(args).stdin(Stdio::null());
        command
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn build_image(&self, spec: &ImageBuildSpec, output: &OutputSink) -> Result<()> {
        info!("Building environment image: {}", spec.tag);

        let args = spec.to_build_args();
        debug!("{} {}", self.binary(), args.join(" "));

        let (stdout, stderr) = output.stdio()?;
        let status = self
            .command(&args)
            .stdout(stdout)
            .stderr(stderr)
            .status()
            .await
            .map_err(|e| DockerError::spawn(self.binary(), e))?;

        if !status.success() {
            return Err(DockerError::BuildFailed {
                tag: spec.tag.clone(),
                reason: format!("{} build exited with {status}", self.binary()),
            });
        }

        info!("Successfully built image: {}", spec.tag);
        Ok(())
    }

    async fn run_container(&self, spec: &ContainerSpec, output: &OutputSink) -> Result<i64> {
        info!("Starting container {} from {}", spec.name, spec.image);

        let args = spec.to_run_args();
        debug!("{} {}", self.binary(), args.join(" "));

        let (stdout, stderr) = output.stdio()?;
        let mut child = self
            .command(&args)
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|e| DockerError::LaunchFailed {
                name: spec.name.clone(),
                reason: format!("failed to run {}: {e}", self.binary()),
            })?;

        let status = child.wait().await?;
        let exit_code = status.code().map_or(SIGNALED_EXIT_CODE, i64::from);

        debug!("Container {} exited with code {}", spec.name, exit_code);
        Ok(exit_code)
    }

    async fn kill_container(&self, name: &str) -> Result<()> {
        debug!("Killing container {}", name);

        let output = self
            .command(&["kill".to_string(), name.to_string()])
            .output()
            .await
            .map_err(|e| DockerError::spawn(self.binary(), e))?;

        if !output.status.success() {
            return Err(DockerError::KillFailed {
                name: name.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    use super::*;

    /// Write an executable shell script standing in for the runtime binary
    fn stub_runtime(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn cli(binary: &Path) -> DockerCli {
        DockerCli::new(DockerConfig { binary: binary.display().to_string() })
    }

    #[tokio::test]
    async fn test_build_image_success() {
        let temp_dir = TempDir::new().unwrap();
        let stub = stub_runtime(temp_dir.path(), "docker", "exit 0");
        let spec = ImageBuildSpec::new("Dockerfile", ".", "pkgfarm-env:test");

        assert!(cli(&stub).build_image(&spec, &OutputSink::Inherit).await.is_ok());
    }

    #[tokio::test]
    async fn test_build_image_failure() {
        let temp_dir = TempDir::new().unwrap();
        let stub = stub_runtime(temp_dir.path(), "docker", "exit 3");
        let spec = ImageBuildSpec::new("Dockerfile", ".", "pkgfarm-env:test");

        let result = cli(&stub).build_image(&spec, &OutputSink::Inherit).await;
        assert!(matches!(result, Err(DockerError::BuildFailed { .. })));
    }

    #[tokio::test]
    async fn test_run_container_reports_exit_code_and_logs() {
        let temp_dir = TempDir::new().unwrap();
        let stub = stub_runtime(temp_dir.path(), "docker", "echo \"$@\"\nexit 7");
        let log_path = temp_dir.path().join("test.buildlog");
        let sink = OutputSink::log_file(&log_path).unwrap();
        let spec = ContainerSpec::new("buildjob_test", "pkgfarm-env:test");

        let exit_code = cli(&stub).run_container(&spec, &sink).await.unwrap();
        sink.close().unwrap();

        assert_eq!(exit_code, 7);
        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("run --rm --name buildjob_test pkgfarm-env:test"));
    }

    #[tokio::test]
    async fn test_run_container_missing_binary_is_launch_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("no-such-runtime");
        let spec = ContainerSpec::new("buildjob_test", "pkgfarm-env:test");

        let result = cli(&missing).run_container(&spec, &OutputSink::Inherit).await;
        assert!(matches!(result, Err(DockerError::LaunchFailed { .. })));
    }

    #[tokio::test]
    async fn test_kill_container() {
        let temp_dir = TempDir::new().unwrap();
        let ok = stub_runtime(temp_dir.path(), "docker-ok", "exit 0");
        assert!(cli(&ok).kill_container("buildjob_test").await.is_ok());

        let failing =
            stub_runtime(temp_dir.path(), "docker-failing", "echo 'No such container' >&2\nexit 1");
        match cli(&failing).kill_container("buildjob_test").await {
            Err(DockerError::KillFailed { name, reason }) => {
                assert_eq!(name, "buildjob_test");
                assert_eq!(reason, "No such container");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
