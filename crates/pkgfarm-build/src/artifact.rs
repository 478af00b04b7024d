//! Shared artifact directory and the packages collected in it

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pkgfarm_core::Target;
use tracing::debug;

use crate::error::{BuildError, Result};

/// Extension of per-target build logs
pub const BUILD_LOG_EXTENSION: &str = "buildlog";

/// Build artifact information
#[derive(Debug, Clone)]
pub struct BuildArtifact {
    /// Package name
    pub package_name: String,
    /// Artifact file path
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Artifact type (e.g., "deb", "dbgsym")
    pub artifact_type: String,
    /// Architecture
    pub architecture: String,
    /// Version
    pub version: String,
}

impl BuildArtifact {
    /// Parse artifact information from a `package_version_arch.deb` filename
    pub fn from_path(path: &Path) -> Option<Self> {
        let filename = path.file_name()?.to_str()?;
        let stem = filename.strip_suffix(".deb")?;

        let parts: Vec<&str> = stem.split('_').collect();
        if parts.len() < 3 {
            return None;
        }

        let artifact_type = if parts[0].ends_with("-dbgsym") { "dbgsym" } else { "deb" };
        let size = std::fs::metadata(path).ok()?.len();

        Some(BuildArtifact {
            package_name: parts[0].to_string(),
            path: path.to_path_buf(),
            size,
            artifact_type: artifact_type.to_string(),
            architecture: parts[2].to_string(),
            version: parts[1].to_string(),
        })
    }

    /// Get the artifact filename
    pub fn filename(&self) -> Option<&str> {
        self.path.file_name()?.to_str()
    }
}

/// Output location shared by every build job
#[derive(Debug, Clone)]
pub struct ArtifactDirectory {
    path: PathBuf,
}

impl ArtifactDirectory {
    /// Create a handle; nothing is touched on disk
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the directory and any missing parents.
    ///
    /// Safe to call from many workers at once: `create_dir_all` treats a
    /// directory created concurrently by another caller as success.
    pub async fn ensure(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.path)
            .await
            .map_err(|source| BuildError::Directory { path: self.path.clone(), source })?;

        debug!("Artifact directory ready: {}", self.path.display());
        Ok(())
    }

    /// Log file for one target: `<tag>.buildlog`
    pub fn log_path(&self, target: &Target) -> PathBuf {
        self.path.join(format!("{}.{BUILD_LOG_EXTENSION}", target.tag()))
    }

    /// Collect `.deb` packages from the top level of the directory
    pub fn collect(&self) -> Result<Vec<BuildArtifact>> {
        let mut artifacts = Vec::new();

        let walker = walkdir::WalkDir::new(&self.path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;

            if entry.file_type().is_file() {
                if let Some(artifact) = BuildArtifact::from_path(entry.path()) {
                    artifacts.push(artifact);
                }
            }
        }

        Ok(artifacts)
    }

    /// Create artifact summary
    pub fn create_summary(artifacts: &[BuildArtifact]) -> String {
        let mut summary = String::new();
        summary.push_str("Build Artifacts:\n");
        summary.push_str("================\n\n");

        let mut by_package: BTreeMap<&str, Vec<&BuildArtifact>> = BTreeMap::new();
        for artifact in artifacts {
            by_package.entry(artifact.package_name.as_str()).or_default().push(artifact);
        }

        for (package, artifacts) in by_package {
            summary.push_str(&format!("Package: {package}\n"));
            for artifact in artifacts {
                let size_mb = artifact.size as f64 / 1_048_576.0;
                summary.push_str(&format!(
                    "  - {} ({:.2} MB) [{}]\n",
                    artifact.filename().unwrap_or("unknown"),
                    size_mb,
                    artifact.artifact_type
                ));
            }
            summary.push('\n');
        }

        let total_size: u64 = artifacts.iter().map(|a| a.size).sum();
        let total_size_mb = total_size as f64 / 1_048_576.0;
        summary.push_str(&format!(
            "Total: {} artifacts, {:.2} MB\n",
            artifacts.len(),
            total_size_mb
        ));

        summary
    }
}
