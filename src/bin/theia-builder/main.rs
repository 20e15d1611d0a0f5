//! theia-builder CLI - compose and build Theia IDE images

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use theia_builder::util::GlobalContext;

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color;

    if let Err(e) = run(cli) {
        commands::report_error(&e, color);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("theia_builder=debug")
    } else {
        EnvFilter::new("theia_builder=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let mut ctx = GlobalContext::new()?;
    ctx.set_color(!cli.no_color);

    // Execute command
    match cli.command {
        Commands::Prepare(args) => commands::prepare::execute(args, &ctx),
        Commands::Build(args) => commands::build::execute(args, &ctx),
        Commands::Modules(args) => commands::modules::execute(args, &ctx),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
