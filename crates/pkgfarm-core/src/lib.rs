//! Core types for pkgfarm
//!
//! This crate provides the build target model, the default target
//! registry, and the shared error type used across the workspace.

pub mod build;
pub mod error;
pub mod target;

pub use build::{BuildJob, JobStatus};
pub use error::{Error, Result};
pub use target::{default_targets, resolve_targets, Target, DEFAULT_TARGETS};
