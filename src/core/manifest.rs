//! `package.json` manifest fragments and the merged output document.
//!
//! Every base, module and workspace-local module may carry a `package.json`
//! fragment. Only two sections take part in composition: `dependencies`
//! (package name to version constraint) and `theiaPlugins` (plugin id to
//! download locator). Any other keys in a fragment are ignored.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::workspace::AppMetadata;

/// The two mergeable sections of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ManifestSection {
    Dependencies,
    TheiaPlugins,
}

impl ManifestSection {
    pub const ALL: [ManifestSection; 2] =
        [ManifestSection::Dependencies, ManifestSection::TheiaPlugins];

    /// The JSON key of this section.
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestSection::Dependencies => "dependencies",
            ManifestSection::TheiaPlugins => "theiaPlugins",
        }
    }
}

impl fmt::Display for ManifestSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A manifest fragment contributed by one layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFragment {
    /// Package name -> version constraint
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Plugin id -> source locator
    #[serde(default, rename = "theiaPlugins")]
    pub theia_plugins: BTreeMap<String, String>,
}

impl ManifestFragment {
    /// Parse a `package.json` fragment.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        serde_json::from_str(content)
            .with_context(|| format!("failed to parse manifest fragment: {}", path.display()))
    }

    /// Load a `package.json` fragment from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest fragment: {}", path.display()))?;
        Self::parse(&content, path)
    }

    /// Get one section.
    pub fn section(&self, section: ManifestSection) -> &BTreeMap<String, String> {
        match section {
            ManifestSection::Dependencies => &self.dependencies,
            ManifestSection::TheiaPlugins => &self.theia_plugins,
        }
    }

    /// Get one section mutably.
    pub fn section_mut(&mut self, section: ManifestSection) -> &mut BTreeMap<String, String> {
        match section {
            ManifestSection::Dependencies => &mut self.dependencies,
            ManifestSection::TheiaPlugins => &mut self.theia_plugins,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty() && self.theia_plugins.is_empty()
    }
}

/// The merged manifest of a composition: exactly one value per key.
pub type MergedManifest = ManifestFragment;

/// The `package.json` written into the workspace directory.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson<'a> {
    private: bool,
    name: &'a str,
    version: &'a str,
    license: &'a str,
    theia: TheiaSection<'a>,
    dependencies: &'a BTreeMap<String, String>,
    theia_plugins: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct TheiaSection<'a> {
    frontend: TheiaFrontend<'a>,
}

#[derive(Debug, Serialize)]
struct TheiaFrontend<'a> {
    config: TheiaFrontendConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TheiaFrontendConfig<'a> {
    application_name: &'a str,
}

impl<'a> PackageJson<'a> {
    pub fn new(app: &'a AppMetadata, manifest: &'a MergedManifest) -> Self {
        PackageJson {
            private: true,
            name: &app.name,
            version: &app.version,
            license: &app.license,
            theia: TheiaSection {
                frontend: TheiaFrontend {
                    config: TheiaFrontendConfig {
                        application_name: &app.title,
                    },
                },
            },
            dependencies: &manifest.dependencies,
            theia_plugins: &manifest.theia_plugins,
        }
    }

    /// Serialize as pretty-printed JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut out =
            serde_json::to_string_pretty(self).context("failed to serialize package.json")?;
        out.push('\n');
        Ok(out)
    }
}
