//! Gotas CLI main entry point

use clap::Parser;
use gotas_cli::{
    cli::{Cli, Commands},
    commands::ToolsCommand,
    error::CliResult,
    utils::{init_tracing, ColoredOutput},
};
use tracing::info;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {}", ColoredOutput::error("Error:"), e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose)?;

    // Disable colored output if requested
    if cli.no_color {
        colored::control::set_override(false);
    }

    info!("Gotas CLI v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve { args } => gotas_cli::commands::serve::execute(args)
            .await
            .map_err(|e| e.into()),

        Commands::Tools { json } => ToolsCommand::run(json),
    }
}
