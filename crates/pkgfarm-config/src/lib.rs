//! Configuration management for pkgfarm
//!
//! This crate handles YAML configuration parsing, validation,
//! and environment variable substitution.

use std::path::{Component, Path, PathBuf};

use pkgfarm_core::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Name of the artifact directory created next to the source tree
pub const ARTIFACT_DIR_NAME: &str = "pkgfarm-artifacts";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source tree mounted read-only into every build container
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Output directory for packages and build logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_dir: Option<PathBuf>,

    /// Build description file for the environment image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<PathBuf>,

    /// Context directory for the environment image build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_context: Option<PathBuf>,

    /// Repository name of environment images, tagged per target
    #[serde(default = "default_image_repo")]
    pub image_repo: String,

    /// Container runtime executable
    #[serde(default = "default_docker_binary")]
    pub docker_binary: String,

    /// Number of targets built concurrently
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Skip the package test phase
    #[serde(default)]
    pub skip_tests: bool,

    /// Targets to build; empty selects the default registry
    #[serde(default)]
    pub targets: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            artifact_dir: None,
            dockerfile: None,
            build_context: None,
            image_repo: default_image_repo(),
            docker_binary: default_docker_binary(),
            jobs: default_jobs(),
            skip_tests: false,
            targets: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigError {
            message: format!("Failed to read config file {path:?}: {e}"),
        })?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigError { message: format!("Failed to parse YAML: {e}") })
    }

    /// Expand environment variables, make paths absolute and validate.
    ///
    /// Call this after all command line overrides have been applied.
    pub fn resolve(mut self) -> Result<Self> {
        self.expand_env_vars()?;

        self.source_dir = self.source_dir.canonicalize().map_err(|e| Error::ConfigError {
            message: format!("Source directory {:?} is not accessible: {e}", self.source_dir),
        })?;

        if let Some(dir) = self.artifact_dir.take() {
            self.artifact_dir = Some(resolve_existing_prefix(&absolute(&dir)?));
        }
        if let Some(file) = self.dockerfile.take() {
            self.dockerfile = Some(absolute(&file)?);
        }
        if let Some(dir) = self.build_context.take() {
            self.build_context = Some(absolute(&dir)?);
        }

        self.validate()?;
        Ok(self)
    }

    /// Expand environment variables in paths
    fn expand_env_vars(&mut self) -> Result<()> {
        self.source_dir = expand_path(&self.source_dir)?;

        for path in [&mut self.artifact_dir, &mut self.dockerfile, &mut self.build_context]
            .into_iter()
            .flatten()
        {
            *path = expand_path(path)?;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.source_dir.is_dir() {
            return Err(Error::ConfigError {
                message: format!("Source directory does not exist: {:?}", self.source_dir),
            });
        }

        let dockerfile = self.dockerfile();
        if !dockerfile.is_file() {
            return Err(Error::ConfigError {
                message: format!("Dockerfile does not exist: {dockerfile:?}"),
            });
        }

        if self.artifact_dir().starts_with(&self.source_dir) {
            return Err(Error::ConfigError {
                message: format!(
                    "Artifact directory {:?} must be outside the source tree",
                    self.artifact_dir()
                ),
            });
        }

        if self.image_repo.is_empty() {
            return Err(Error::ConfigError {
                message: "Image repository name cannot be empty".to_string(),
            });
        }

        if self.docker_binary.is_empty() {
            return Err(Error::ConfigError {
                message: "Container runtime executable cannot be empty".to_string(),
            });
        }

        if self.jobs == 0 {
            return Err(Error::ConfigError { message: "jobs must be at least 1".to_string() });
        }

        Ok(())
    }

    /// Artifact directory, defaulting to a sibling of the source tree
    pub fn artifact_dir(&self) -> PathBuf {
        match &self.artifact_dir {
            Some(dir) => dir.clone(),
            None => self
                .source_dir
                .parent()
                .unwrap_or(&self.source_dir)
                .join(ARTIFACT_DIR_NAME),
        }
    }

    /// Dockerfile path, defaulting to `Dockerfile` at the source root
    pub fn dockerfile(&self) -> PathBuf {
        self.dockerfile
            .clone()
            .unwrap_or_else(|| self.source_dir.join("Dockerfile"))
    }

    /// Image build context, defaulting to the Dockerfile's directory
    pub fn build_context(&self) -> PathBuf {
        if let Some(dir) = &self.build_context {
            return dir.clone();
        }

        let dockerfile = self.dockerfile();
        dockerfile
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.source_dir.clone())
    }

    /// Whether per-target output goes to log files instead of the terminal
    pub fn redirect_output(&self) -> bool {
        self.jobs > 1
    }
}

/// Expand environment variables in a path
fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path.to_string_lossy();
    let env_var_re =
        Regex::new(r"\$\{([^}]+)\}|\$([A-Za-z_][A-Za-z0-9_]*)").expect("Invalid regex");

    let mut result = path_str.to_string();
    for cap in env_var_re.captures_iter(&path_str) {
        let Some(var_name) = cap.get(1).or_else(|| cap.get(2)).map(|m| m.as_str()) else {
            continue;
        };
        let var_value = std::env::var(var_name).map_err(|_| Error::ConfigError {
            message: format!("Environment variable not found: {var_name}"),
        })?;

        result = result.replace(&cap[0], &var_value);
    }

    Ok(PathBuf::from(result))
}

/// Make a path absolute against the current directory
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let cwd = std::env::current_dir()
        .map_err(|e| Error::context("Failed to read current directory", e))?;
    Ok(cwd.join(path))
}

/// Drop `.` and `..` components without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Canonicalize the deepest existing ancestor of an absolute path and
/// re-append the components that do not exist yet
fn resolve_existing_prefix(path: &Path) -> PathBuf {
    let normalized = normalize(path);
    let mut existing = normalized.as_path();
    let mut rest = Vec::new();

    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return rest.iter().rev().fold(canonical, |acc: PathBuf, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return normalized,
        }
    }
}

fn default_source_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_image_repo() -> String {
    "pkgfarm-env".to_string()
}

fn default_docker_binary() -> String {
    "docker".to_string()
}

fn default_jobs() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use std::env;

    use tempfile::TempDir;

    use super::*;

    fn source_tree() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("project");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("Dockerfile"), "ARG BASE_IMAGE\nFROM ${BASE_IMAGE}\n").unwrap();
        (temp_dir, source)
    }

    #[test]
    fn test_expand_path() {
        env::set_var("PKGFARM_TEST_VAR", "/test/path");

        let path = PathBuf::from("${PKGFARM_TEST_VAR}/sub");
        let expanded = expand_path(&path).unwrap();
        assert_eq!(expanded, PathBuf::from("/test/path/sub"));

        let path = PathBuf::from("$PKGFARM_TEST_VAR/sub");
        let expanded = expand_path(&path).unwrap();
        assert_eq!(expanded, PathBuf::from("/test/path/sub"));
    }

    #[test]
    fn test_expand_path_missing_variable() {
        let path = PathBuf::from("${PKGFARM_SURELY_UNSET_VARIABLE}/sub");
        assert!(expand_path(&path).is_err());
    }

    #[test]
    fn test_defaults_from_minimal_yaml() {
        let config = Config::from_yaml("source_dir: /srv/project\n").unwrap();
        assert_eq!(config.jobs, 1);
        assert!(!config.skip_tests);
        assert!(config.targets.is_empty());
        assert_eq!(config.image_repo, "pkgfarm-env");
        assert_eq!(config.docker_binary, "docker");
        assert_eq!(config.artifact_dir(), PathBuf::from("/srv").join(ARTIFACT_DIR_NAME));
        assert_eq!(config.dockerfile(), PathBuf::from("/srv/project/Dockerfile"));
        assert_eq!(config.build_context(), PathBuf::from("/srv/project"));
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
source_dir: /srv/project
artifact_dir: /var/cache/out
dockerfile: /srv/docker/Dockerfile.build
image_repo: builders
jobs: 3
skip_tests: true
targets:
  - debian:bookworm
  - ubuntu:noble
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.jobs, 3);
        assert!(config.skip_tests);
        assert!(config.redirect_output());
        assert_eq!(config.targets, vec!["debian:bookworm", "ubuntu:noble"]);
        assert_eq!(config.artifact_dir(), PathBuf::from("/var/cache/out"));
        assert_eq!(config.build_context(), PathBuf::from("/srv/docker"));
    }

    #[test]
    fn test_resolve_valid_config() {
        let (temp_dir, source) = source_tree();
        let config = Config { source_dir: source, ..Config::default() }.resolve().unwrap();

        let expected = temp_dir.path().canonicalize().unwrap().join(ARTIFACT_DIR_NAME);
        assert_eq!(config.artifact_dir(), expected);
        assert!(!config.redirect_output());
    }

    #[test]
    fn test_resolve_rejects_zero_jobs() {
        let (_temp_dir, source) = source_tree();
        let config = Config { source_dir: source, jobs: 0, ..Config::default() };
        assert!(config.resolve().is_err());
    }

    #[test]
    fn test_resolve_rejects_missing_dockerfile() {
        let (_temp_dir, source) = source_tree();
        std::fs::remove_file(source.join("Dockerfile")).unwrap();

        let config = Config { source_dir: source, ..Config::default() };
        assert!(config.resolve().is_err());
    }

    #[test]
    fn test_resolve_rejects_artifacts_inside_source() {
        let (_temp_dir, source) = source_tree();
        let config = Config {
            artifact_dir: Some(source.join("out")),
            source_dir: source,
            ..Config::default()
        };
        assert!(config.resolve().is_err());
    }

    #[test]
    fn test_resolve_rejects_artifacts_reaching_into_source() {
        let (temp_dir, source) = source_tree();
        let config = Config {
            artifact_dir: Some(temp_dir.path().join("elsewhere/../project/out")),
            source_dir: source,
            ..Config::default()
        };
        assert!(config.resolve().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_artifacts_through_symlink() {
        let (temp_dir, source) = source_tree();
        let link = temp_dir.path().join("link");
        std::os::unix::fs::symlink(&source, &link).unwrap();

        let config = Config {
            artifact_dir: Some(link.join("out")),
            source_dir: source,
            ..Config::default()
        };
        assert!(config.resolve().is_err());
    }

    #[test]
    fn test_normalize_drops_dot_components() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/a/b/../../..")), PathBuf::from("/"));
    }

    #[test]
    fn test_resolved_artifact_dir_is_normalized() {
        let (temp_dir, source) = source_tree();
        let config = Config {
            artifact_dir: Some(temp_dir.path().join("project/../out/./debs")),
            source_dir: source,
            ..Config::default()
        }
        .resolve()
        .unwrap();

        let expected = temp_dir.path().canonicalize().unwrap().join("out/debs");
        assert_eq!(config.artifact_dir(), expected);
    }
}
