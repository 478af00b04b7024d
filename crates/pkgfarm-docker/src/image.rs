//! Environment image build specification

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Everything needed to build one environment image
#[derive(Debug, Clone)]
pub struct ImageBuildSpec {
    /// Dockerfile path
    pub dockerfile: PathBuf,
    /// Build context directory
    pub context: PathBuf,
    /// Image reference to tag the result with
    pub tag: String,
    /// Build arguments
    pub build_args: BTreeMap<String, String>,
    /// Labels to apply
    pub labels: BTreeMap<String, String>,
}

impl ImageBuildSpec {
    /// Create a new image build specification
    pub fn new(
        dockerfile: impl Into<PathBuf>,
        context: impl Into<PathBuf>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            dockerfile: dockerfile.into(),
            context: context.into(),
            tag: tag.into(),
            build_args: BTreeMap::new(),
            labels: BTreeMap::new(),
        }
    }

    /// Add a build argument
    pub fn with_build_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.build_args.insert(key.into(), value.into());
        self
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Arguments for `docker build`, excluding the program name
    pub fn to_build_args(&self) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            "--file".to_string(),
            self.dockerfile.display().to_string(),
            "--tag".to_string(),
            self.tag.clone(),
        ];

        for (key, value) in &self.build_args {
            args.push("--build-arg".to_string());
            args.push(format!("{key}={value}"));
        }

        for (key, value) in &self.labels {
            args.push("--label".to_string());
            args.push(format!("{key}={value}"));
        }

        args.push(self.context.display().to_string());
        args
    }
}
