mod config;
mod telemetry;

use clap::{Args, Parser, Subcommand};
use config::{Config, ConfigError};
use std::path::PathBuf;
use std::process::ExitCode;
use telemetry::TelemetryError;

#[derive(Parser)]
#[command(name = "masterkey", about = "Brokerage site server", version)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve the site, the data proxy and the admin endpoints
    Serve(ConfigArgs),
    /// Load and validate a config file, then exit
    CheckConfig(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long, short, default_value = "masterkey.yaml")]
    config: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("could not start runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error(transparent)]
    Site(#[from] site::errors::SiteError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        CliCommand::Serve(args) => serve(args),
        CliCommand::CheckConfig(args) => Config::load(&args.config)
            .map(|_| println!("{}: ok", args.config.display()))
            .map_err(CliError::from),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "exiting");
            eprintln!("masterkey: {e}");
            ExitCode::FAILURE
        }
    }
}

fn serve(args: ConfigArgs) -> Result<(), CliError> {
    let config = Config::load(&args.config)?;

    let _sentry = telemetry::init_logging(&config.common.logging, config.site.environment)?;
    if let Some(metrics) = &config.common.metrics {
        telemetry::init_metrics(metrics)?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    runtime.block_on(site::run(config.site))?;

    Ok(())
}
