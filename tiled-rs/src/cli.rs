//! Root CLI structure for tiled-rs

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tiled-rs")]
#[command(about = "Command-line tools for Tiled TMX maps and navigation graphs", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// TMX map operations
    Tmx {
        #[command(subcommand)]
        command: crate::commands::tmx::TmxCommands,
    },

    /// Build the waypoint navigation graph of a map
    Nav(crate::commands::nav::NavArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
