//! Test utilities for unit tests.
//!
//! Provides in-memory catalog builders for engine tests and on-disk
//! fixtures (in [`fixtures`]) for loader and operation tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::test_support::{base, fragment, module, registry};
//!
//! let registry = registry(
//!     base("theia", &[("a", "1")]),
//!     vec![module("m1", "theia", None, fragment(&[("a", "2")], &[]))],
//! );
//! ```

pub mod fixtures;

pub use fixtures::*;

use crate::core::manifest::ManifestFragment;
use crate::core::module::{BaseDescriptor, ModuleDescriptor, ModuleVariant};
use crate::core::registry::ModuleRegistry;
use crate::core::workspace::WorkspaceDefinition;

/// Scaffold that emits each injected fragment on its own line.
pub const PLAIN_SCAFFOLD: &str = "FROM base:{{ app.base_tag }}\n{% for s in scripts %}\n{{ s }}\n{% endfor %}\n";

/// Build a manifest fragment from dependency and plugin pairs.
pub fn fragment(dependencies: &[(&str, &str)], plugins: &[(&str, &str)]) -> ManifestFragment {
    ManifestFragment {
        dependencies: dependencies
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        theia_plugins: plugins
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

/// A base using [`PLAIN_SCAFFOLD`] with the given dependencies.
pub fn base(name: &str, dependencies: &[(&str, &str)]) -> BaseDescriptor {
    BaseDescriptor::new(name, PLAIN_SCAFFOLD, fragment(dependencies, &[]))
        .expect("fixture scaffold is valid")
}

/// A module supporting a single base.
pub fn module(
    name: &str,
    base: &str,
    script: Option<&str>,
    manifest: ManifestFragment,
) -> ModuleDescriptor {
    let variant =
        ModuleVariant::new(name, base, script, manifest).expect("fixture script is valid");
    ModuleDescriptor::new(name).with_variant(base, variant)
}

/// Freeze a registry from one base and some modules.
pub fn registry(base: BaseDescriptor, modules: Vec<ModuleDescriptor>) -> ModuleRegistry {
    modules
        .into_iter()
        .fold(ModuleRegistry::builder().base(base), |b, m| b.module(m))
        .build()
}

/// A parsed definition on `base` selecting `modules`.
pub fn definition(base: &str, modules: &[&str]) -> WorkspaceDefinition {
    WorkspaceDefinition::parse(&definition_yaml("demo", base, modules))
        .expect("fixture definition is valid")
}
