use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use partmatch::{
    cli::CliApp,
    cli_types::{Cli, Commands},
    config::CliConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        CliConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.output.quiet |= cli.quiet;
    let verbose = cli.verbose || config.output.verbose;
    init_logging(verbose);

    let app = CliApp::new(config, verbose, !cli.no_color)?;

    match cli.command {
        Commands::Resolve(args) => {
            app.resolve(args).await?;
        }
        Commands::Inspect(args) => app.inspect(args).await?,
        Commands::Colors(args) => app.colors(args).await?,
        Commands::Config => app.show_config()?,
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `--verbose` enables debug output for this crate
fn init_logging(verbose: bool) {
    let default_directive = if verbose { "partmatch=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
