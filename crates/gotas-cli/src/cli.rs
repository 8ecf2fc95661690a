//! CLI argument definitions using clap

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gotas",
    about = "Gotas Commerce - MCP tool gateway for crypto payments",
    version,
    author = "Gotas Team"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the tool gateway (HTTP by default)
    Serve {
        #[command(flatten)]
        args: crate::commands::ServeArgs,
    },
    /// Print the tool catalog
    Tools {
        /// Print the catalog as JSON
        #[arg(long, help = "Print the catalog as JSON")]
        json: bool,
    },
}
