//! Implementation of `theia-builder build`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::core::workspace::{Workspace, WorkspaceDefinition, DEFAULT_TAG};
use crate::util::diagnostic::suggestions;
use crate::util::process::{find_docker, ProcessBuilder};

/// Options for the build command.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Also tag the image as `latest`
    pub latest: bool,

    /// Print the command instead of running it
    pub dry_run: bool,

    /// Container build tool from the config, if any
    pub docker: Option<PathBuf>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            latest: true,
            dry_run: false,
            docker: None,
        }
    }
}

/// The image build that ran, or would run under `--dry-run`.
#[derive(Debug, Clone)]
pub struct BuildResult {
    /// Tags applied to the image, primary tag first
    pub tags: Vec<String>,

    /// The full command line
    pub command: String,

    /// Whether the command actually ran
    pub executed: bool,
}

/// Image tags for `definition`, primary tag first.
///
/// `<org>/<name>:<version>`, then the same under `build.registry` if set,
/// then the `latest` variants of both when `latest` is requested.
pub fn image_tags(definition: &WorkspaceDefinition, latest: bool) -> Vec<String> {
    let repository = definition.image_repository();
    let registry = definition.build.registry.as_deref();

    let mut versions = vec![definition.app.version.as_str()];
    if latest && definition.app.version != DEFAULT_TAG {
        versions.push(DEFAULT_TAG);
    }

    let mut tags = Vec::new();
    for version in versions {
        tags.push(format!("{}:{}", repository, version));
        if let Some(registry) = registry {
            tags.push(format!(
                "{}/{}:{}",
                registry.trim_end_matches('/'),
                repository,
                version
            ));
        }
    }
    tags
}

/// The `docker build` invocation for `workspace`.
pub fn docker_command(workspace: &Workspace, docker: &Path, latest: bool) -> ProcessBuilder {
    let definition = workspace.definition();

    let mut cmd = ProcessBuilder::new(docker).arg("build");
    for tag in image_tags(definition, latest) {
        cmd = cmd.arg("--tag").arg(tag);
    }
    for (name, value) in &definition.build.arguments {
        cmd = cmd.arg("--build-arg").arg(format!("{}={}", name, value));
    }

    cmd.arg("--file")
        .arg(workspace.script_path())
        .arg(workspace.root())
        .cwd(workspace.root())
}

/// Build the container image for a prepared workspace.
pub fn build(workspace: &Workspace, opts: &BuildOptions) -> Result<BuildResult> {
    let script = workspace.script_path();
    if !script.is_file() {
        bail!(
            "`{}` has not been prepared: {} not found\n{}",
            workspace.definition().app.name,
            script.display(),
            suggestions::NOT_PREPARED
        );
    }

    let docker = if opts.dry_run {
        opts.docker.clone().unwrap_or_else(|| PathBuf::from("docker"))
    } else {
        match find_docker(opts.docker.as_deref()) {
            Some(path) => path,
            None => bail!("no container build tool found\n{}", suggestions::NO_DOCKER),
        }
    };

    let cmd = docker_command(workspace, &docker, opts.latest);
    let command = cmd.display_command();
    let tags = image_tags(workspace.definition(), opts.latest);

    if opts.dry_run {
        tracing::debug!("dry run: {}", command);
        return Ok(BuildResult {
            tags,
            command,
            executed: false,
        });
    }

    tracing::info!("running {}", command);
    let status = cmd.status()?;
    if !status.success() {
        bail!(
            "image build failed with exit code {:?}\n{}",
            status.code(),
            suggestions::BUILD_FAILED
        );
    }

    Ok(BuildResult {
        tags,
        command,
        executed: true,
    })
}
