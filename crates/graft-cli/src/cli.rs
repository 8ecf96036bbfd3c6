//! CLI argument definitions for graft.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "graft",
    version,
    about = "Resolve package dependency graphs",
    long_about = "graft expands a root recipe into a single consistent dependency graph: \
                  shared dependencies are reconciled, aliases followed, private and build \
                  requirements isolated, and the result can be printed or locked."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Inputs shared by every command that resolves a graph.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Root recipe (defaults to graft.toml in this directory or a parent)
    pub recipe: Option<PathBuf>,

    /// Directory of recipe files (defaults to `recipes/` next to the root recipe)
    #[arg(short, long)]
    pub index: Option<PathBuf>,

    /// Profile with settings, options and build requirements
    #[arg(short, long)]
    pub profile: Option<PathBuf>,

    /// Global configuration file
    #[arg(long, env = "GRAFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Check remotes for newer recipes and use them
    #[arg(long)]
    pub update: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the dependency graph as a tree
    Graph {
        #[command(flatten)]
        resolve: ResolveArgs,
        /// Resolve with the references and ids pinned in this lock file
        #[arg(short, long)]
        lockfile: Option<PathBuf>,
        /// Extra build requirement for the root (repeatable)
        #[arg(long = "build-require", value_name = "REF")]
        build_requires: Vec<String>,
        /// Maximum depth
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Resolve the graph and write a lock file
    Lock {
        #[command(flatten)]
        resolve: ResolveArgs,
        /// Where to write the lock file
        #[arg(short, long, default_value = "graft.lock")]
        output: PathBuf,
    },

    /// List every node with its recipe status, plus the alias table
    Info {
        #[command(flatten)]
        resolve: ResolveArgs,
        /// Resolve with this lock file
        #[arg(short, long)]
        lockfile: Option<PathBuf>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
