//! Container specification

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Container specification, always removed once it exits
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    /// Container name, unique among running containers
    pub name: String,

    /// Image to run
    pub image: String,

    /// Environment variables
    pub environment: BTreeMap<String, String>,

    /// Volume mounts
    pub volumes: Vec<VolumeMount>,
}

/// Volume mount specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    /// Host path
    pub host_path: PathBuf,

    /// Container path
    pub container_path: String,

    /// Read-only mount
    pub read_only: bool,
}

impl VolumeMount {
    /// Read-only bind mount
    pub fn read_only(host_path: impl Into<PathBuf>, container_path: impl Into<String>) -> Self {
        Self { host_path: host_path.into(), container_path: container_path.into(), read_only: true }
    }

    /// Read-write bind mount
    pub fn read_write(host_path: impl Into<PathBuf>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
            read_only: false,
        }
    }

    /// `host:container[:ro]` form accepted by `--volume`
    pub fn bind_spec(&self) -> String {
        format!(
            "{}:{}{}",
            self.host_path.display(),
            self.container_path,
            if self.read_only { ":ro" } else { "" }
        )
    }
}

impl ContainerSpec {
    /// Create a new container specification
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            environment: BTreeMap::new(),
            volumes: Vec::new(),
        }
    }

    /// Add environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Add volume mount
    pub fn with_volume(mut self, mount: VolumeMount) -> Self {
        self.volumes.push(mount);
        self
    }

    /// Arguments for `docker run`, excluding the program name
    pub fn to_run_args(&self) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            self.name.clone(),
        ];

        for mount in &self.volumes {
            args.push("--volume".to_string());
            args.push(mount.bind_spec());
        }

        for (key, value) in &self.environment {
            args.push("--env".to_string());
            args.push(format!("{key}={value}"));
        }

        args.push(self.image.clone());
        args
    }
}
