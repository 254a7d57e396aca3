//! Root CLI structure for ghs-rs

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ghs-rs")]
#[command(about = "Command-line tools for Gregory Horror Show file formats", long_about = None)]
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
    /// PM2 model operations
    Pm2 {
        #[command(subcommand)]
        command: crate::commands::pm2::Pm2Commands,
    },

    /// MAP-PM2 room container operations
    Map {
        #[command(subcommand)]
        command: crate::commands::map::MapCommands,
    },

    /// MPR pose track operations
    #[cfg(feature = "anim")]
    Mpr {
        #[command(subcommand)]
        command: crate::commands::mpr::MprCommands,
    },

    /// GHS character description and animation operations
    #[cfg(feature = "anim")]
    Ghs {
        #[command(subcommand)]
        command: crate::commands::ghs::GhsCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
