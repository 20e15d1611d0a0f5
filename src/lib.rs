//! theia-builder - compose Theia IDE images from reusable modules
//!
//! This crate provides the library behind the `theia-builder` tool: the
//! module catalog, workspace definitions, the composition engine and the
//! operations that write and build the composed artifacts.

pub mod compose;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities for theia-builder unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides in-memory catalogs and on-disk fixtures.
#[cfg(test)]
pub mod test_support;

pub use compose::{ComposeError, Composer, CompositionResult, SchemaError};
pub use core::{ModuleRegistry, Workspace, WorkspaceDefinition};
pub use util::context::GlobalContext;
