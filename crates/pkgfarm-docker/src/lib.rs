//! Container runtime integration for pkgfarm
//!
//! This crate drives the external container runtime: building per-target
//! environment images, running named build containers, and killing them.

pub mod client;
pub mod container;
pub mod error;
pub mod image;
pub mod output;
pub mod service;

pub use client::{DockerCli, DockerConfig};
pub use container::{ContainerSpec, VolumeMount};
pub use error::{DockerError, Result};
pub use image::ImageBuildSpec;
pub use output::OutputSink;
pub use service::ContainerRuntime;
