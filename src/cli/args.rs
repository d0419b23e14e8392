//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// pkglink - link local packages into your project
///
/// Registers local packages as real members of the project's dependency
/// tree, then keeps their files mirrored into node_modules as they change.
#[derive(Parser, Debug)]
#[command(name = "pkglink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Subcommand to execute; bare paths imply `link`
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Package directories to link (interactive selection when omitted)
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Link local packages into the current project and keep them in sync
    Link(LinkArgs),

    /// Show the packages currently linked into this project
    Status,

    /// Show or edit where pkglink looks for linkable packages
    Config(ConfigArgs),
}

/// Arguments for the link command
#[derive(Parser, Debug)]
pub struct LinkArgs {
    /// Package directories to link (interactive selection when omitted)
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration file path and the configured roots
    Show,

    /// Add a directory to scan for linkable packages
    Add {
        /// Directory containing packages (or a single package)
        root: PathBuf,
    },

    /// Remove a directory from the scan list
    Remove {
        /// Previously added directory
        root: PathBuf,
    },
}
