//! discrip entry point.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use discrip_cli::{Cli, CliError, Commands, RipperConfig, bootstrap, handlers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env first so RUST_LOG from it applies to the subscriber
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = dispatch(cli).await {
        let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        error!("{err:#}");
        std::process::exit(code);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let command = cli.command_or_default();
    let config = RipperConfig::from_cli(&cli)?;

    match command {
        Commands::Run => {
            let cancel = CancellationToken::new();
            tokio::spawn(cancel_on_signal(cancel.clone()));
            handlers::run(config, cancel).await?;
            Ok(())
        }
        Commands::Status => handlers::status(&bootstrap(&config)).await,
        Commands::Eject => handlers::eject(&bootstrap(&config)).await,
        Commands::Close => handlers::close(&bootstrap(&config)).await,
        Commands::Info => handlers::info(&bootstrap(&config)).await,
        Commands::Identify => handlers::identify(&bootstrap(&config)).await,
    }
}

/// Cancel on Ctrl-C or SIGTERM.
async fn cancel_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown requested");
    cancel.cancel();
}
