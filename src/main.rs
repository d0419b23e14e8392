//! pkglink - link local packages into your project
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use pkglink::cli::args::LinkArgs;
use pkglink::cli::{commands, Cli, Commands};
use pkglink::error::PkglinkResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PkglinkResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn (spinners only), 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("pkglink=warn"),
        1 => EnvFilter::new("pkglink=info"),
        _ => EnvFilter::new("pkglink=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    pkglink::ui::init_theme();

    match cli.command {
        None => commands::link(LinkArgs { paths: cli.paths }).await,
        Some(Commands::Link(args)) => commands::link(args).await,
        Some(Commands::Status) => commands::status().await,
        Some(Commands::Config(args)) => commands::config(args).await,
    }
}
