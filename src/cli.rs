//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Quaver widget runtime CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: quaver.toml)
    #[arg(short = 'C', long, global = true, default_value = "quaver.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Watch widget sources, rebuild on change and hot-swap live widgets
    #[command(visible_alias = "r")]
    Run {
        /// Layout file to open (saved back on exit)
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        layout: Option<PathBuf>,
    },

    /// Build one widget directory and print diagnostics
    #[command(visible_alias = "b")]
    Build {
        /// Widget directory
        #[arg(value_hint = clap::ValueHint::DirPath)]
        dir: PathBuf,
    },
}
