//! Core data structures for theia-builder.
//!
//! This module contains the descriptors the composer works on:
//! - Manifest fragments and the generated `package.json`
//! - Base and module descriptors with their parameter schemas
//! - The module registry (catalog)
//! - Workspace definitions

pub mod manifest;
pub mod module;
pub mod registry;
pub mod workspace;

pub use manifest::{ManifestFragment, ManifestSection, MergedManifest, PackageJson};
pub use module::{BaseDescriptor, LocalModule, ModuleDescriptor, ModuleVariant, ParamDomain, ParamSpec};
pub use registry::ModuleRegistry;
pub use workspace::{AppMetadata, BuildMetadata, Workspace, WorkspaceDefinition, WORKSPACE_FILE};
