//! Implementation of `theia-builder prepare`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::compose::{Composer, ManifestConflict};
use crate::core::manifest::PackageJson;
use crate::core::registry::ModuleRegistry;
use crate::core::workspace::Workspace;
use crate::util::config::Config;
use crate::util::fs::write_atomic;

/// What `prepare` wrote for one workspace.
#[derive(Debug, Clone)]
pub struct PrepareResult {
    /// Path of the generated build script
    pub script_path: PathBuf,

    /// Path of the generated manifest
    pub manifest_path: PathBuf,

    /// Manifest conflicts resolved by precedence
    pub conflicts: Vec<ManifestConflict>,
}

/// Pick the catalog directory for `workspace`.
///
/// An explicit `--module-dir` wins over `catalog.module_dir` in the config,
/// which wins over the workspace's parent directory. A relative configured
/// path is taken relative to the workspace.
pub fn resolve_module_dir(
    explicit: Option<&Path>,
    config: &Config,
    workspace: &Workspace,
) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    match &config.catalog.module_dir {
        Some(dir) if dir.is_relative() => workspace.root().join(dir),
        Some(dir) => dir.clone(),
        None => workspace.default_module_dir(),
    }
}

/// Compose `workspace` and write its `Dockerfile` and `package.json`.
///
/// Both artifacts are fully composed before either file is written, and the
/// two files are replaced together. `package.json` comes from the base's
/// `package.json.j2` when the catalog has one, and from the built-in layout
/// otherwise.
pub fn prepare(workspace: &Workspace, registry: &ModuleRegistry) -> Result<PrepareResult> {
    let definition = workspace.definition();

    let composed = Composer::new(registry)
        .compose(workspace)
        .with_context(|| format!("failed to compose `{}`", definition.app.name))?;

    let manifest = match composed.package_json {
        Some(text) => {
            serde_json::from_str::<serde_json::Value>(&text).with_context(|| {
                format!(
                    "package.json template of base `{}` did not render valid JSON",
                    definition.app.base
                )
            })?;
            text
        }
        None => PackageJson::new(&definition.app, &composed.manifest).to_json()?,
    };

    let script_path = workspace.script_path();
    let manifest_path = workspace.manifest_path();

    write_atomic(&[
        (script_path.as_path(), composed.script.as_str()),
        (manifest_path.as_path(), manifest.as_str()),
    ])?;
    tracing::info!("wrote {}", script_path.display());
    tracing::info!("wrote {}", manifest_path.display());

    Ok(PrepareResult {
        script_path,
        manifest_path,
        conflicts: composed.conflicts,
    })
}
