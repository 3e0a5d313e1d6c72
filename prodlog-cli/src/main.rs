//! prodlog -- demultiplex, parse and grep Rails production logs.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use colored::Colorize;

use prodlog_core::config::ProdlogConfig;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli {
        config: config_path,
        log_level,
        output,
        command,
    } = cli;
    let writer = OutputWriter::new(output);

    let loaded = ProdlogConfig::load_or_default(&config_path)
        .await
        .and_then(|mut config| {
            if let Some(level) = &log_level {
                config.general.log_level = level.clone();
                config.validate()?;
            }
            Ok(config)
        });

    // `config validate` reports load failures itself, so logging falls back to defaults
    let mut general = loaded
        .as_ref()
        .map(|config| config.general.clone())
        .unwrap_or_default();
    if let Some(level) = log_level {
        general.log_level = level;
    }
    logging::init_tracing(&general).map_err(|e| CliError::Command(e.to_string()))?;
    prodlog_core::metrics::describe_all();

    tracing::debug!(config = %config_path.display(), "prodlog starting");

    match command {
        Commands::Config(args) => commands::config::execute(args, &config_path, &writer).await,
        Commands::Grep(args) => commands::grep::execute(args, &loaded?, &writer).await,
        Commands::Parse(args) => commands::parse::execute(args, &loaded?, &writer).await,
        Commands::Report(args) => commands::report::execute(args, &loaded?, &writer).await,
    }
}
