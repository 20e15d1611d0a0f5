//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// theia-builder - compose Theia IDE images from reusable modules
#[derive(Parser)]
#[command(name = "theia-builder")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate the Dockerfile and package.json of one or more applications
    Prepare(PrepareArgs),

    /// Build the container image of a prepared application
    Build(BuildArgs),

    /// List the modules in the catalog
    Modules(ModulesArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct PrepareArgs {
    /// Application directories, each containing application.yaml
    #[arg(required = true)]
    pub app_dirs: Vec<PathBuf>,

    /// Catalog directory (default: the parent of each application directory)
    #[arg(short, long, env = "THEIA_BUILDER_MODULE_DIR")]
    pub module_dir: Option<PathBuf>,

    /// Number of applications prepared in parallel
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Application directory, prepared with `theia-builder prepare`
    pub app_dir: PathBuf,

    /// Additionally to the version tag, add a `latest` tag to the image
    #[arg(long, overrides_with = "no_latest")]
    pub latest: bool,

    /// Only tag the image with its version
    #[arg(long, overrides_with = "latest")]
    pub no_latest: bool,

    /// Print the build command instead of running it
    #[arg(long)]
    pub dry_run: bool,
}

impl BuildArgs {
    /// `Some` when either flag was given; the last one wins.
    pub fn latest(&self) -> Option<bool> {
        match (self.latest, self.no_latest) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Args)]
pub struct ModulesArgs {
    /// Catalog directory
    #[arg(short, long, env = "THEIA_BUILDER_MODULE_DIR", default_value = ".")]
    pub module_dir: PathBuf,

    /// Only list modules supporting this base
    #[arg(long)]
    pub base: Option<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
