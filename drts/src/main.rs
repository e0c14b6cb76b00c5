mod config;

use clap::{Parser, Subcommand};
use config::Config;
use sentry::types::Dsn;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(version, about = "Relays DRTS validation requests to the configured upstream")]
struct Cli {
    /// YAML config file. A `.env` file and the environment override its values.
    #[arg(long, global = true)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve the relay until SIGINT or SIGTERM
    Serve,
    /// Load and validate the config, then exit
    CheckConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config_file.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("could not load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        CliCommand::CheckConfig => {
            println!("{config:#?}");
            println!("config ok");
            ExitCode::SUCCESS
        }
        CliCommand::Serve => serve(config),
    }
}

fn serve(config: Config) -> ExitCode {
    let dsn = match config.common.sentry_dsn().map(str::parse::<Dsn>).transpose() {
        Ok(dsn) => dsn,
        Err(e) => {
            eprintln!("invalid sentry dsn: {e}");
            return ExitCode::FAILURE;
        }
    };
    let _sentry = init_logging(dsn);

    if let Some(metrics) = config.common.metrics()
        && let Err(e) = shared::metrics::init(&metrics, "drts")
    {
        tracing::error!(error = %e, "Failed to initialize metrics");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Starting relay");
    match runtime.block_on(relay::run(config.relay)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Relay exited with error");
            ExitCode::FAILURE
        }
    }
}

/// Installs the global tracing subscriber. Events are also forwarded to Sentry
/// when a DSN is configured; the returned guard flushes Sentry on drop.
fn init_logging(dsn: Option<Dsn>) -> Option<sentry::ClientInitGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let guard = dsn.map(|dsn| {
        sentry::init(sentry::ClientOptions {
            dsn: Some(dsn),
            release: sentry::release_name!(),
            ..Default::default()
        })
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(guard.as_ref().map(|_| sentry::integrations::tracing::layer()))
        .init();

    guard
}
