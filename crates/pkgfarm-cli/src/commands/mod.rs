//! CLI command implementations

pub mod build;
pub mod targets;

pub use build::BuildCommand;
pub use targets::list_targets;
