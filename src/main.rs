use anyhow::{Context, Result};
use clap::Parser;

use codefix::cli::CliApp;
use codefix::cli_types::{Cli, Commands};
use codefix::config::Settings;
use codefix::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    logging::init(&settings.logging, cli.verbose);

    let mut app = CliApp::new(settings, cli.verbose, !cli.no_color);

    match cli.command {
        Commands::Serve(args) => app.serve(args).await,
        Commands::Scan(args) => app.scan(args).await,
        Commands::Debug(args) => app.debug(args).await,
    }
}
