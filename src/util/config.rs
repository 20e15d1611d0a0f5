//! Configuration file support for theia-builder.
//!
//! Two configuration file locations are read:
//! - Global: `~/.theia-builder/config.toml` - User-wide defaults
//! - Project: `<app>/.theia-builder/config.toml` - Workspace-specific overrides
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Name of the tool directory, both in the home directory and in workspaces.
pub const TOOL_DIR: &str = ".theia-builder";

/// Name of the configuration file inside [`TOOL_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// theia-builder configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog settings
    pub catalog: CatalogConfig,

    /// Image build settings
    pub build: BuildConfig,
}

/// Where modules and bases are read from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Catalog directory (default: the workspace's parent directory)
    pub module_dir: Option<PathBuf>,
}

/// Image build configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Container build tool (default: `docker` on PATH)
    pub docker: Option<PathBuf>,

    /// Also tag images as `latest` (default: true)
    pub latest: Option<bool>,

    /// Number of workspaces prepared in parallel (None = one per CPU)
    pub jobs: Option<usize>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.catalog.module_dir.is_some() {
            self.catalog.module_dir = other.catalog.module_dir;
        }

        if other.build.docker.is_some() {
            self.build.docker = other.build.docker;
        }
        if other.build.latest.is_some() {
            self.build.latest = other.build.latest;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
    }

    /// Whether images get an extra `latest` tag.
    pub fn tag_latest(&self) -> bool {
        self.build.latest.unwrap_or(true)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (`<app>/.theia-builder/config.toml`)
/// 2. Global config (`~/.theia-builder/config.toml`)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global config directory (`~/.theia-builder`).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(TOOL_DIR))
}

/// Get the project config path (`<app>/.theia-builder/config.toml`).
pub fn project_config_path(app_root: &Path) -> PathBuf {
    app_root.join(TOOL_DIR).join(CONFIG_FILE)
}
