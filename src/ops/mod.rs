//! High-level operations.
//!
//! This module contains the implementation of theia-builder commands.

pub mod build;
pub mod prepare;

pub use build::{build, docker_command, image_tags, BuildOptions, BuildResult};
pub use prepare::{prepare, resolve_module_dir, PrepareResult};
