use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use regsync::EtcdRegistry;
use regsync::Error;
use regsync::LoggingConfig;
use regsync::Result;
use regsync::Runtime;
use regsync::Settings;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

/// Keeps reverse-proxy configuration, the navigation menu and the
/// maintenance page in sync with the registry.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Configuration file (YAML or TOML)
    #[arg(
        short,
        long,
        env = "REGSYNC_CONFIG",
        default_value = "/etc/regsync/config.yaml"
    )]
    config: PathBuf,

    /// Registry endpoint, replaces the configured endpoints; repeatable
    #[arg(short, long, env = "REGSYNC_ENDPOINT", value_delimiter = ',')]
    endpoint: Vec<String>,
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(&cli.config)?;
    if !cli.endpoint.is_empty() {
        settings.registry.endpoints = cli.endpoint;
        settings.validate()?;
    }

    // Initializing Logs
    let _guard = init_observability(&settings.logging)?;
    info!("loaded configuration from {:?}", cli.config);

    let registry = Arc::new(EtcdRegistry::new(&settings.registry)?);

    // Initializing Shutdown Signal
    let (graceful_tx, graceful_rx) = watch::channel(());

    let runtime = Runtime::from_settings(registry, &settings, graceful_rx).await;
    info!(
        "watching registry at {:?} for {} targets. Waiting for SIGINT/SIGTERM...",
        settings.registry.endpoints,
        runtime.target_count()
    );

    // Listen on Shutdown Signal
    tokio::spawn(async {
        if let Err(e) = graceful_shutdown(graceful_tx).await {
            error!("Failed to shutdown: {:?}", e);
        }
    });

    runtime.join().await;
    info!("Exiting program.");
    Ok(())
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| Error::Fatal(format!("failed to install SIGINT handler: {e}")))?;
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| Error::Fatal(format!("failed to install SIGTERM handler: {e}")))?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
    }

    graceful_tx.send(()).map_err(|e| {
        error!("Failed to send shutdown signal: {}", e);
        Error::Fatal(format!("Failed to send shutdown signal: {}", e))
    })?;

    info!("Shutdown requested, finishing running passes");
    Ok(())
}

/// `RUST_LOG` wins over the configured level. Logs go to
/// `<log_dir>/regsync.log` when a directory is configured, stdout otherwise.
fn init_observability(config: &LoggingConfig) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::InvalidConfig(format!("invalid log level {}: {e}", config.level)))?;

    let (non_blocking, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                Error::Fatal(format!("failed to create log directory {}: {e}", dir.display()))
            })?;
            tracing_appender::non_blocking(tracing_appender::rolling::never(
                Path::new(dir),
                "regsync.log",
            ))
        }
        None => tracing_appender::non_blocking(std::io::stdout()),
    };

    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(filter);
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}
