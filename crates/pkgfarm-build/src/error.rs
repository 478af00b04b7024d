//! Error types for the build orchestration module

use std::path::PathBuf;

use pkgfarm_core::Target;
use pkgfarm_docker::DockerError;
use thiserror::Error;

/// Build-specific error types
#[derive(Error, Debug)]
pub enum BuildError {
    /// Environment image could not be built
    #[error("Failed to build environment image for {target}: {source}")]
    EnvironmentBuild {
        target: Target,
        #[source]
        source: DockerError,
    },

    /// Container instance failed to start
    #[error("Failed to launch container {container}: {source}")]
    ContainerLaunch {
        container: String,
        #[source]
        source: DockerError,
    },

    /// Container instance ran but exited unsuccessfully
    #[error("Container {container} exited with code {exit_code}")]
    ContainerExit { container: String, exit_code: i64 },

    /// Artifact directory could not be created
    #[error("Failed to create artifact directory {path:?}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Per-target log file could not be opened or flushed
    #[error("Build log {path:?} failed: {reason}")]
    LogFile { path: PathBuf, reason: String },

    /// Shutdown was requested before the container could start
    #[error("Build interrupted before container {container} started")]
    Interrupted { container: String },

    /// A worker task ended without reporting its job
    #[error("Build worker terminated unexpectedly: {reason}")]
    WorkerLost { reason: String },
}

/// Result type alias for build operations
pub type Result<T> = std::result::Result<T, BuildError>;

impl BuildError {
    /// Create an environment build error
    pub fn environment(target: &Target, source: DockerError) -> Self {
        Self::EnvironmentBuild { target: target.clone(), source }
    }

    /// Create a container launch error
    pub fn launch(container: impl Into<String>, source: DockerError) -> Self {
        Self::ContainerLaunch { container: container.into(), source }
    }

    /// Create a container exit error
    pub fn exit(container: impl Into<String>, exit_code: i64) -> Self {
        Self::ContainerExit { container: container.into(), exit_code }
    }

    /// Check if an error was caused by an interrupt
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}

/// A failed build, attributed to its target
#[derive(Error, Debug)]
#[error("Build failed for target {target}: {source}")]
pub struct BuildJobError {
    /// Target whose build failed
    pub target: Target,
    /// Underlying cause
    #[source]
    pub source: BuildError,
}

impl BuildJobError {
    /// Attribute an error to a target
    pub fn new(target: Target, source: BuildError) -> Self {
        Self { target, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_error_names_target_and_cause() {
        let err = BuildJobError::new(
            Target::new("fam:a"),
            BuildError::exit("buildjob_a", 2),
        );
        assert_eq!(
            err.to_string(),
            "Build failed for target fam:a: Container buildjob_a exited with code 2"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_environment_error_keeps_runtime_cause() {
        let cause = DockerError::BuildFailed {
            tag: "pkgfarm-env:sid".to_string(),
            reason: "exit status: 1".to_string(),
        };
        let err = BuildError::environment(&Target::new("debian:sid"), cause);
        assert_eq!(
            err.to_string(),
            "Failed to build environment image for debian:sid: \
             Docker build of pkgfarm-env:sid failed: exit status: 1"
        );

        let source = std::error::Error::source(&err).unwrap();
        assert!(matches!(
            source.downcast_ref::<DockerError>(),
            Some(DockerError::BuildFailed { .. })
        ));
        assert!(!err.is_interrupt());
        assert!(BuildError::Interrupted { container: "buildjob_sid".into() }.is_interrupt());
    }
}
