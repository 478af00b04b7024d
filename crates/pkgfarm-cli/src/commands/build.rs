//! Build command implementation

use std::path::{Path, PathBuf};
use std::sync::Arc;

use color_eyre::eyre::{bail, Context, Result};
use pkgfarm_build::{
    setup_signal_handlers, ArtifactDirectory, BuildContext, BuildSettings, IndicatifProgressUI,
    Orchestrator, ShutdownManager,
};
use pkgfarm_config::Config;
use pkgfarm_core::resolve_targets;
use pkgfarm_docker::{DockerCli, DockerConfig};
use tracing::{info, warn};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "pkgfarm.yaml";

/// Build command implementation
#[derive(Debug, Default)]
pub struct BuildCommand {
    pub config_path: Option<PathBuf>,
    pub source_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub skip_tests: bool,
    pub targets: Vec<String>,
}

impl BuildCommand {
    pub async fn execute(&self) -> Result<()> {
        let config = self.load_config()?;
        let targets = resolve_targets(config.targets.clone());

        info!("Source directory: {}", config.source_dir.display());
        info!("Artifact directory: {}", config.artifact_dir().display());
        info!("Parallel jobs: {}", config.jobs);
        if config.skip_tests {
            info!("Package tests disabled");
        }

        let runtime = Arc::new(DockerCli::new(DockerConfig {
            binary: config.docker_binary.clone(),
        }));
        let shutdown = Arc::new(ShutdownManager::new());
        setup_signal_handlers(Arc::clone(&shutdown))
            .await
            .wrap_err("Failed to install signal handlers")?;

        let settings = BuildSettings::from_config(&config);
        let context = Arc::new(BuildContext::with_shutdown(settings, runtime, shutdown));

        let mut orchestrator = Orchestrator::new(Arc::clone(&context));
        if config.redirect_output() {
            orchestrator =
                orchestrator.with_progress(Arc::new(IndicatifProgressUI::new(targets.len())));
        }

        let (report, error) = orchestrator.execute(targets).await;

        println!("\n{}", report.summary());
        print_artifacts(context.artifacts());

        if let Some(error) = error {
            return Err(error).wrap_err("Build run failed");
        }
        if !report.is_success() {
            bail!("Build run was interrupted");
        }

        println!("✨ All targets built successfully");
        Ok(())
    }

    /// Load the config file, apply command line overrides and validate
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config_path {
            Some(path) => read_config(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                read_config(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Config::default(),
        };

        if let Some(source_dir) = &self.source_dir {
            config.source_dir = source_dir.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.artifact_dir = Some(output_dir.clone());
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if self.skip_tests {
            config.skip_tests = true;
        }
        if !self.targets.is_empty() {
            config.targets = self.targets.clone();
        }

        config.resolve().wrap_err("Invalid configuration")
    }
}

fn read_config(path: &Path) -> Result<Config> {
    Config::from_file(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

fn print_artifacts(artifacts: &ArtifactDirectory) {
    match artifacts.collect() {
        Ok(found) if found.is_empty() => {}
        Ok(found) => println!("{}", ArtifactDirectory::create_summary(&found)),
        Err(e) => warn!("Could not list artifacts in {}: {}", artifacts.path().display(), e),
    }
}
