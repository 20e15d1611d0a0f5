//! `theia-builder prepare` command

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rayon::prelude::*;

use crate::cli::PrepareArgs;
use theia_builder::core::{ModuleRegistry, Workspace};
use theia_builder::ops::{prepare, resolve_module_dir};
use theia_builder::util::diagnostic;
use theia_builder::util::GlobalContext;

pub fn execute(args: PrepareArgs, ctx: &GlobalContext) -> Result<()> {
    // Load every workspace and its catalog up front; one registry per
    // distinct catalog directory, shared by all workspaces using it. A
    // workspace that fails to load is reported with the others.
    let mut registries: HashMap<PathBuf, Arc<ModuleRegistry>> = HashMap::new();
    let mut jobs = Vec::with_capacity(args.app_dirs.len());

    for app_dir in &args.app_dirs {
        let root = ctx.resolve(app_dir);
        jobs.push(load(&root, &args, ctx, &mut registries));
    }

    let threads = args.jobs.or(ctx.config_for(ctx.cwd()).build.jobs).unwrap_or(0);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("failed to start worker threads")?;

    let total = jobs.len();
    let results: Vec<Result<_>> = pool.install(|| {
        jobs.into_par_iter()
            .map(|job| {
                let (ws, registry) = job?;
                let prepared = prepare(&ws, &registry)?;
                Ok((ws, prepared))
            })
            .collect()
    });

    let mut failed = 0;
    for result in results {
        match result {
            Ok((ws, prepared)) => {
                for conflict in &prepared.conflicts {
                    diagnostic::emit(&conflict.to_diagnostic(), ctx.color());
                }
                println!(
                    "Prepared `{}` at {}",
                    ws.definition().app.name,
                    ws.root().display()
                );
            }
            Err(e) => {
                failed += 1;
                super::report_error(&e, ctx.color());
            }
        }
    }

    if failed > 0 {
        bail!("failed to prepare {} of {} application(s)", failed, total);
    }

    Ok(())
}

fn load(
    root: &Path,
    args: &PrepareArgs,
    ctx: &GlobalContext,
    registries: &mut HashMap<PathBuf, Arc<ModuleRegistry>>,
) -> Result<(Workspace, Arc<ModuleRegistry>)> {
    let ws = Workspace::load(root)?;
    let config = ctx.config_for(root);

    let module_dir = resolve_module_dir(args.module_dir.as_deref(), &config, &ws);
    let registry = match registries.get(&module_dir) {
        Some(registry) => Arc::clone(registry),
        None => {
            tracing::debug!("loading catalog {}", module_dir.display());
            let registry = Arc::new(ModuleRegistry::load(&module_dir).with_context(|| {
                format!("failed to load catalog for `{}`", ws.definition().app.name)
            })?);
            registries.insert(module_dir, Arc::clone(&registry));
            registry
        }
    };

    Ok((ws, registry))
}
