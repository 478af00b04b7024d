//! Build executor for running one target's build in a container

use std::sync::Arc;

use nix::unistd::{getgid, getuid};
use pkgfarm_core::{BuildJob, Target};
use pkgfarm_docker::{ContainerSpec, OutputSink, VolumeMount};
use tracing::{debug, error, info, warn};

use crate::context::BuildContext;
use crate::environment::EnvironmentBuilder;
use crate::error::{BuildError, BuildJobError, Result};

/// Where the source tree appears inside the container
pub const SOURCE_MOUNT: &str = "/src";
/// Where the artifact directory appears inside the container
pub const ARTIFACT_MOUNT: &str = "/artifacts";

/// Name of the container building `target`
pub fn container_name(target: &Target) -> String {
    format!("buildjob_{}", target.tag())
}

/// Numeric identity of the invoking user, handed to the container so
/// artifacts are written with the right ownership
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserIdentity {
    pub uid: u32,
    pub gid: u32,
}

impl UserIdentity {
    pub fn current() -> Self {
        Self { uid: getuid().as_raw(), gid: getgid().as_raw() }
    }
}

/// Runs build jobs end-to-end against a shared [`BuildContext`]
#[derive(Debug, Clone)]
pub struct BuildExecutor {
    context: Arc<BuildContext>,
    environment: EnvironmentBuilder,
    identity: UserIdentity,
}

impl BuildExecutor {
    /// Create a new build executor
    pub fn new(context: Arc<BuildContext>) -> Self {
        Self::with_identity(context, UserIdentity::current())
    }

    /// Create an executor that passes a fixed user identity to containers
    pub fn with_identity(context: Arc<BuildContext>, identity: UserIdentity) -> Self {
        let environment = EnvironmentBuilder::new(Arc::clone(&context));
        Self { context, environment, identity }
    }

    /// Run one job.
    ///
    /// The job is skipped without side effects if an earlier job failed.
    /// On failure the fail-fast flag is set before the error is returned.
    pub async fn run(&self, job: &mut BuildJob) -> std::result::Result<(), BuildJobError> {
        if self.context.failure().is_set() {
            info!("[{}] Skipping, an earlier build failed", job.target);
            job.skip();
            return Ok(());
        }

        job.start();
        info!("[{}] Starting build", job.target);

        match self.execute(job).await {
            Ok(()) => {
                info!("[{}] Build succeeded", job.target);
                job.succeed();
                Ok(())
            }
            Err(source) => {
                self.context.failure().record(&job.target);
                if source.is_interrupt() {
                    warn!("[{}] {}", job.target, source);
                } else {
                    error!("Build failed for target {}: {}", job.target, source);
                }
                job.fail(source.to_string());
                Err(BuildJobError::new(job.target.clone(), source))
            }
        }
    }

    async fn execute(&self, job: &mut BuildJob) -> Result<()> {
        self.context.artifacts().ensure().await?;

        let output = self.open_output(job)?;
        let result = self.build_and_run(&job.target, job.skip_tests, &output).await;

        let log_path = output.path().map(|p| p.to_path_buf());
        let closed = output.close().map_err(|e| BuildError::LogFile {
            path: log_path.unwrap_or_default(),
            reason: e.to_string(),
        });

        result?;
        closed
    }

    fn open_output(&self, job: &mut BuildJob) -> Result<OutputSink> {
        if !self.context.settings().redirect_output {
            return Ok(OutputSink::Inherit);
        }

        let path = self.context.artifacts().log_path(&job.target);
        debug!("[{}] Writing output to {}", job.target, path.display());

        let sink = OutputSink::log_file(&path)
            .map_err(|e| BuildError::LogFile { path: path.clone(), reason: e.to_string() })?;
        job.log_path = Some(path);
        Ok(sink)
    }

    async fn build_and_run(
        &self,
        target: &Target,
        skip_tests: bool,
        output: &OutputSink,
    ) -> Result<()> {
        let image = self.environment.build(target, output).await?;

        let name = container_name(target);
        let spec = self.container_spec(&name, &image, skip_tests);
        let registry = self.context.registry();

        registry.register(&name);
        if self.context.is_shutdown_requested() {
            registry.unregister(&name);
            return Err(BuildError::Interrupted { container: name });
        }

        let result = self.context.runtime().run_container(&spec, output).await;
        registry.unregister(&name);

        match result {
            Ok(0) => Ok(()),
            Ok(exit_code) => Err(BuildError::exit(name, exit_code)),
            Err(e) => Err(BuildError::launch(name, e)),
        }
    }

    /// Container request for one build
    pub fn container_spec(&self, name: &str, image: &str, skip_tests: bool) -> ContainerSpec {
        let settings = self.context.settings();
        ContainerSpec::new(name, image)
            .with_volume(VolumeMount::read_only(&settings.source_dir, SOURCE_MOUNT))
            .with_volume(VolumeMount::read_write(self.context.artifacts().path(), ARTIFACT_MOUNT))
            .with_env("USER_ID", self.identity.uid.to_string())
            .with_env("GROUP_ID", self.identity.gid.to_string())
            .with_env("DEB_BUILD_OPTIONS", if skip_tests { "nocheck" } else { "" })
    }
}
