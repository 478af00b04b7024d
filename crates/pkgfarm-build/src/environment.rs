//! Per-target environment image builds

use std::sync::Arc;

use pkgfarm_core::Target;
use pkgfarm_docker::{ImageBuildSpec, OutputSink};
use tracing::info;

use crate::context::BuildContext;
use crate::error::{BuildError, Result};

/// Build argument carrying the base image for the Dockerfile
pub const BASE_IMAGE_ARG: &str = "BASE_IMAGE";
/// Label recording which target an image was built for
pub const TARGET_LABEL: &str = "pkgfarm.target";

/// Builds the environment image a target's container runs in
#[derive(Debug, Clone)]
pub struct EnvironmentBuilder {
    context: Arc<BuildContext>,
}

impl EnvironmentBuilder {
    pub fn new(context: Arc<BuildContext>) -> Self {
        Self { context }
    }

    /// Image build request for a target
    pub fn spec_for(&self, target: &Target) -> ImageBuildSpec {
        let settings = self.context.settings();
        ImageBuildSpec::new(
            &settings.dockerfile,
            &settings.build_context,
            settings.image_for(target),
        )
        .with_build_arg(BASE_IMAGE_ARG, target.as_str())
        .with_label(TARGET_LABEL, target.as_str())
    }

    /// Build the image for `target` and return its reference
    pub async fn build(&self, target: &Target, output: &OutputSink) -> Result<String> {
        let spec = self.spec_for(target);
        info!("[{}] Building environment image {}", target, spec.tag);

        self.context
            .runtime()
            .build_image(&spec, output)
            .await
            .map_err(|e| BuildError::environment(target, e))?;

        Ok(spec.tag)
    }
}
