//! `theia-builder modules` command

use anyhow::{bail, Result};

use crate::cli::ModulesArgs;
use theia_builder::core::ModuleRegistry;
use theia_builder::util::GlobalContext;

pub fn execute(args: ModulesArgs, ctx: &GlobalContext) -> Result<()> {
    let module_dir = ctx.resolve(&args.module_dir);
    let registry = ModuleRegistry::load(&module_dir)?;

    if let Some(ref base) = args.base {
        if registry.base(base).is_none() {
            bail!(
                "unknown base `{}`\navailable bases: {}",
                base,
                registry.base_names().join(", ")
            );
        }
    }

    println!("Bases: {}", registry.base_names().join(", "));
    println!();

    let mut shown = 0;
    for module in registry.modules() {
        if let Some(ref base) = args.base {
            if !module.supports(base) {
                continue;
            }
        }
        shown += 1;

        match module.description() {
            Some(description) => println!("{} - {}", module.name(), description),
            None => println!("{}", module.name()),
        }
        println!(
            "    Bases:      {}",
            module.supported_bases().collect::<Vec<_>>().join(", ")
        );
        for (name, spec) in module.parameters() {
            println!(
                "    Parameter:  {} ({}, default `{}`)",
                name, spec.domain, spec.default
            );
        }
    }

    if shown == 0 {
        println!("No modules found.");
    }

    Ok(())
}
