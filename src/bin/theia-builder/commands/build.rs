//! `theia-builder build` command

use anyhow::Result;

use crate::cli::BuildArgs;
use theia_builder::core::Workspace;
use theia_builder::ops::{build, BuildOptions};
use theia_builder::util::GlobalContext;

pub fn execute(args: BuildArgs, ctx: &GlobalContext) -> Result<()> {
    let root = ctx.resolve(&args.app_dir);
    let ws = Workspace::load(&root)?;

    // CLI > config > default (true)
    let config = ctx.config_for(&root);
    let latest = args.latest().unwrap_or_else(|| config.tag_latest());

    let opts = BuildOptions {
        latest,
        dry_run: args.dry_run,
        docker: config.build.docker.clone(),
    };

    let result = build(&ws, &opts)?;

    if result.executed {
        println!("Built {}", result.tags.join(", "));
    } else {
        println!("{}", result.command);
    }

    Ok(())
}
