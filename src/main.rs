mod cli;
mod commands;
mod util;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.device_config()?;
    match cli.command {
        Commands::Recipient(args) => commands::recipient::run_recipient(&config, args)?,
        Commands::Confirm(args) => commands::confirm::run_confirm(&config, args)?,
        Commands::Wrap(args) => commands::wrap::run_wrap(args)?,
        Commands::Unwrap(args) => commands::unwrap::run_unwrap(&config, args)?,
        Commands::Emulate(args) => commands::emulate::run_emulate(args)?,
    }

    Ok(())
}

/// Logs go to stderr. `--verbose` forces debug; otherwise `RUST_LOG` applies.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("age_plugin_ledger=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("age_plugin_ledger=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
