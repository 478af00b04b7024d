//! Container runtime error types

use thiserror::Error;

/// Container runtime error type
#[derive(Error, Debug)]
pub enum DockerError {
    /// The runtime executable could not be started
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Image build exited unsuccessfully
    #[error("Docker build of {tag} failed: {reason}")]
    BuildFailed { tag: String, reason: String },

    /// Container could not be started
    #[error("Failed to launch container {name}: {reason}")]
    LaunchFailed { name: String, reason: String },

    /// Kill request was rejected by the runtime
    #[error("Failed to kill container {name}: {reason}")]
    KillFailed { name: String, reason: String },

    /// I/O error while redirecting output or waiting on the runtime
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for container runtime operations
pub type Result<T> = std::result::Result<T, DockerError>;

impl DockerError {
    /// Create a spawn error for the given program
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn { program: program.into(), source }
    }
}
