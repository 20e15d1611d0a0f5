//! Module registry - the read-only catalog of bases and modules.
//!
//! The registry is assembled once, either in memory through
//! [`RegistryBuilder`] or from a catalog directory with
//! [`ModuleRegistry::load`], and is immutable afterwards. It is `Send + Sync`
//! and can be shared behind an `Arc` by any number of compositions.
//!
//! Catalog layout:
//!
//! ```text
//! <module_dir>/base/Dockerfile.j2                shared scaffold (fallback)
//! <module_dir>/base/package.json.j2              shared package.json template (optional)
//! <module_dir>/base/<base>/Dockerfile.j2         scaffold for <base>
//! <module_dir>/base/<base>/package.json.j2       package.json template for <base> (optional)
//! <module_dir>/base/<base>/package.json          base manifest
//! <module_dir>/modules/<m>/module.yaml           description and parameters
//! <module_dir>/modules/<m>/package.json          manifest shared by all bases
//! <module_dir>/modules/<m>/<base>/Dockerfile     script template for <base>
//! <module_dir>/modules/<m>/<base>/package.json   manifest for <base>
//! ```
//!
//! A module supports a base exactly when `modules/<m>/<base>/` exists.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

use crate::core::manifest::ManifestFragment;
use crate::core::module::{BaseDescriptor, ModuleDescriptor, ModuleSpecFile, ModuleVariant};
use crate::core::workspace::{MANIFEST_FILE, SCRIPT_FILE};

/// Directory of base scaffolds inside a catalog.
pub const BASE_DIR: &str = "base";

/// Directory of modules inside a catalog.
pub const MODULES_DIR: &str = "modules";

/// File name of base scaffold templates.
pub const BASE_TEMPLATE: &str = "Dockerfile.j2";

/// File name of optional `package.json` templates.
pub const PACKAGE_TEMPLATE: &str = "package.json.j2";

/// File name of module descriptions.
pub const MODULE_SPEC_FILE: &str = "module.yaml";

/// The catalog of known bases and modules.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    bases: BTreeMap<String, BaseDescriptor>,
    modules: BTreeMap<String, ModuleDescriptor>,
    root: Option<PathBuf>,
}

impl ModuleRegistry {
    /// Start building an in-memory registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Load a catalog directory.
    pub fn load(module_dir: &Path) -> Result<Self> {
        if !module_dir.is_dir() {
            bail!(
                "module directory not found: {}\n\
                 help: pass `--module-dir` or set `catalog.module_dir` in the config",
                module_dir.display()
            );
        }

        let mut builder = RegistryBuilder::default();

        let base_root = module_dir.join(BASE_DIR);
        let shared_scaffold = base_root.join(BASE_TEMPLATE);
        let shared_package = base_root.join(PACKAGE_TEMPLATE);
        for (name, dir) in subdirs(&base_root)? {
            let scaffold = if dir.join(BASE_TEMPLATE).is_file() {
                dir.join(BASE_TEMPLATE)
            } else if shared_scaffold.is_file() {
                shared_scaffold.clone()
            } else {
                bail!(
                    "base `{}` has no {} (looked in {} and {})",
                    name,
                    BASE_TEMPLATE,
                    dir.display(),
                    base_root.display()
                );
            };

            let text = crate::util::fs::read_to_string(&scaffold)?;
            let manifest = load_fragment(&dir.join(MANIFEST_FILE))?.unwrap_or_default();
            let mut base = BaseDescriptor::new(name.as_str(), &text, manifest)
                .with_context(|| format!("invalid base template: {}", scaffold.display()))?;

            let package = [dir.join(PACKAGE_TEMPLATE), shared_package.clone()]
                .into_iter()
                .find(|path| path.is_file());
            if let Some(package) = package {
                let text = crate::util::fs::read_to_string(&package)?;
                base = base
                    .with_package_template(&text)
                    .with_context(|| format!("invalid base template: {}", package.display()))?;
                tracing::debug!("base `{}` renders package.json from {}", name, package.display());
            }

            tracing::debug!("loaded base `{}` from {}", name, scaffold.display());
            builder = builder.base(base);
        }

        for (name, dir) in subdirs(&module_dir.join(MODULES_DIR))? {
            let module = load_module(&name, &dir)?;
            tracing::debug!(
                "loaded module `{}` (bases: {})",
                name,
                module.supported_bases().collect::<Vec<_>>().join(", ")
            );
            builder = builder.module(module);
        }

        let mut registry = builder.build();
        registry.root = Some(module_dir.to_path_buf());
        Ok(registry)
    }

    /// Look up a module by name.
    pub fn lookup(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.modules.get(name)
    }

    /// Look up a base by name.
    pub fn base(&self, name: &str) -> Option<&BaseDescriptor> {
        self.bases.get(name)
    }

    /// Whether `module` exists and supports `base`.
    pub fn supports_base(&self, module: &str, base: &str) -> bool {
        self.lookup(module).is_some_and(|m| m.supports(base))
    }

    /// All modules, ordered by name.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.values()
    }

    /// All bases, ordered by name.
    pub fn bases(&self) -> impl Iterator<Item = &BaseDescriptor> {
        self.bases.values()
    }

    /// Names of all bases.
    pub fn base_names(&self) -> Vec<String> {
        self.bases.keys().cloned().collect()
    }

    /// The catalog directory this registry was loaded from, if any.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

/// Collects descriptors before the registry is frozen.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    bases: BTreeMap<String, BaseDescriptor>,
    modules: BTreeMap<String, ModuleDescriptor>,
}

impl RegistryBuilder {
    /// Add a base; a later base with the same name replaces an earlier one.
    pub fn base(mut self, base: BaseDescriptor) -> Self {
        self.bases.insert(base.name().to_string(), base);
        self
    }

    /// Add a module; a later module with the same name replaces an earlier one.
    pub fn module(mut self, module: ModuleDescriptor) -> Self {
        self.modules.insert(module.name().to_string(), module);
        self
    }

    pub fn build(self) -> ModuleRegistry {
        ModuleRegistry {
            bases: self.bases,
            modules: self.modules,
            root: None,
        }
    }
}

fn load_module(name: &str, dir: &Path) -> Result<ModuleDescriptor> {
    let mut module = ModuleDescriptor::new(name);

    let spec_path = dir.join(MODULE_SPEC_FILE);
    if spec_path.is_file() {
        let content = crate::util::fs::read_to_string(&spec_path)?;
        let spec: ModuleSpecFile = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", spec_path.display()))?;
        module = spec
            .apply(module)
            .with_context(|| format!("invalid module description: {}", spec_path.display()))?;
    }

    let shared_manifest = load_fragment(&dir.join(MANIFEST_FILE))?;

    for (base, base_dir) in subdirs(dir)? {
        let script_path = base_dir.join(SCRIPT_FILE);
        let script = if script_path.is_file() {
            Some(crate::util::fs::read_to_string(&script_path)?)
        } else {
            None
        };

        let manifest = match load_fragment(&base_dir.join(MANIFEST_FILE))? {
            Some(fragment) => fragment,
            None => shared_manifest.clone().unwrap_or_default(),
        };

        let variant = ModuleVariant::new(name, &base, script.as_deref(), manifest)
            .with_context(|| format!("invalid module template: {}", script_path.display()))?;
        module = module.with_variant(base, variant);
    }

    Ok(module)
}

fn load_fragment(path: &Path) -> Result<Option<ManifestFragment>> {
    if path.is_file() {
        ManifestFragment::load(path).map(Some)
    } else {
        Ok(None)
    }
}

/// Immediate subdirectories of `dir` as `(name, path)`, sorted by name.
///
/// A missing `dir` yields an empty list.
fn subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut result = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry =
            entry.with_context(|| format!("failed to read directory: {}", dir.display()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        result.push((name, entry.into_path()));
    }

    Ok(result)
}
