//! Container runtime trait

use async_trait::async_trait;

use crate::container::ContainerSpec;
use crate::error::Result;
use crate::image::ImageBuildSpec;
use crate::output::OutputSink;

/// Operations pkgfarm needs from a container runtime
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Build an environment image, blocking until the build finishes
    async fn build_image(&self, spec: &ImageBuildSpec, output: &OutputSink) -> Result<()>;

    /// Launch a container and wait for it to exit.
    ///
    /// Returns the container's exit code. A container that could not be
    /// started at all is an error, not an exit code.
    async fn run_container(&self, spec: &ContainerSpec, output: &OutputSink) -> Result<i64>;

    /// Forcibly terminate a running container by name
    async fn kill_container(&self, name: &str) -> Result<()>;
}
