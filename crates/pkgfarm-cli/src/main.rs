//! Main CLI entry point for pkgfarm

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing_subscriber::EnvFilter;

mod commands;

/// pkgfarm - Build packages for many distributions in parallel containers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    quiet: u8,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of targets built concurrently
    #[arg(short = 'j', long, value_name = "N")]
    jobs: Option<usize>,

    /// Skip the package test phase
    #[arg(long)]
    no_check: bool,

    /// Override the source directory
    #[arg(short, long, value_name = "DIR")]
    source: Option<PathBuf>,

    /// Override the artifact directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Print the default targets and exit
    #[arg(long)]
    list_targets: bool,

    /// Targets to build, as `family:tag`
    #[arg(value_name = "TARGET")]
    targets: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet)?;

    if cli.list_targets {
        commands::list_targets();
        return Ok(());
    }

    let command = commands::BuildCommand {
        config_path: cli.config,
        source_dir: cli.source,
        output_dir: cli.output,
        jobs: cli.jobs,
        skip_tests: cli.no_check,
        targets: cli.targets,
    };

    if let Err(e) = command.execute().await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn setup_logging(verbose: u8, quiet: u8) -> Result<()> {
    let log_level = match (verbose, quiet) {
        (0, 0) => "info",
        (1, 0) => "debug",
        (_, 0) => "trace",
        (0, 1) => "warn",
        (0, 2) => "error",
        (0, _) => "off",
        _ => "info",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
