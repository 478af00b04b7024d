//! Build orchestration for pkgfarm
//!
//! This crate runs one containerized build per target over a bounded pool
//! of workers, tracking running containers so an interrupt can tear them
//! all down, and stopping new work after the first failure.

pub mod artifact;
pub mod context;
pub mod environment;
pub mod error;
pub mod executor;
pub mod graceful_shutdown;
pub mod orchestrator;
pub mod progress_ui;
pub mod registry;
pub mod report;

pub use artifact::{ArtifactDirectory, BuildArtifact, BUILD_LOG_EXTENSION};
pub use context::{BuildContext, BuildSettings, FailureFlag};
pub use environment::EnvironmentBuilder;
pub use error::{BuildError, BuildJobError, Result};
pub use executor::{container_name, BuildExecutor, UserIdentity, ARTIFACT_MOUNT, SOURCE_MOUNT};
pub use graceful_shutdown::{
    setup_signal_handlers, InterruptAction, ShutdownManager, ShutdownReason, ShutdownSignal,
    FORCED_EXIT_CODE,
};
pub use orchestrator::Orchestrator;
pub use progress_ui::{IndicatifProgressUI, JobEvent, NoOpProgressUI, ProgressUI};
pub use registry::ContainerRegistry;
pub use report::BuildReport;
