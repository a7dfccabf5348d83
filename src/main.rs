// ABOUTME: Main entry point for the Slack machine bot
// ABOUTME: Initializes logging and config, wires the Web API, cache, synchronizer, listener, and scheduler

use anyhow::{Context, Result};
use clap::Parser;
use machine::{
    config::Config, metrics, paths, scheduler, slack, traits::SlackApi, EntityCache,
    EventSynchronizer, MachineClient, SyncOptions,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Slack bot with an event-synchronized user and channel cache
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "MACHINE_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Emit console logs as JSON
    #[arg(long)]
    log_json: bool,
}

/// Console layer plus a daily rolling file under the data dir.
/// The returned guard must live until exit so buffered lines are flushed.
fn init_logging(log_json: bool) -> Result<WorkerGuard> {
    let log_dir = paths::log_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("machine")
        .filename_suffix("log")
        .build(&log_dir)
        .context("Failed to initialize rolling log file")?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,slack_morphism=warn".into()),
        )
        .with(log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!log_json).then(|| tracing_subscriber::fmt::layer()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    Ok(guard)
}

fn install_metrics_exporter(port: u16) -> Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    metrics::describe_metrics();
    tracing::info!(%addr, "Prometheus metrics endpoint listening");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Set up panic hook to log panics before they crash the process
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("\nPANIC! machine crashed with the following error:\n");
        eprintln!("{}", panic_info);
        eprintln!("\nBacktrace:");
        eprintln!("{:?}", std::backtrace::Backtrace::force_capture());
    }));

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.log_json)?;

    tracing::info!("Starting machine");

    let config = Config::load_from(cli.config.as_deref())?;
    tracing::info!(
        sync_channels = config.sync.channels,
        event_buffer = config.sync.event_buffer,
        scheduler_interval_secs = config.scheduler.check_interval_secs,
        metrics_port = ?config.metrics.port,
        http_proxy = config.slack.http_proxy.is_some(),
        "Configuration loaded"
    );

    if let Some(port) = config.metrics.port {
        install_metrics_exporter(port)?;
    }

    // Web API adapter and bot identity
    let web_api = slack::web_api(&config.slack)?;
    let bot = web_api.auth_test().await?;

    // Cache, deferred runner, and the client facade that ties them together
    let cache = Arc::new(EntityCache::new());
    let deferred = Arc::new(scheduler::TokioScheduler::new());
    let client = Arc::new(
        MachineClient::new(web_api, Arc::clone(&cache)).with_scheduler(deferred.clone()),
    );

    let synchronizer = EventSynchronizer::new(
        Arc::clone(&client),
        SyncOptions {
            sync_channels: config.sync.channels,
        },
    );

    let (tx, rx) = mpsc::channel(config.sync.event_buffer);
    let listener = slack::listener::start_listener(&config.slack.app_token, bot, tx).await?;

    let scheduler_handle = tokio::spawn(scheduler::start_scheduler(
        deferred,
        Arc::clone(&client),
        Duration::from_secs(config.scheduler.check_interval_secs),
    ));

    tracing::info!("Bot running. Press Ctrl+C to stop.");

    let outcome = tokio::select! {
        result = synchronizer.run(rx) => {
            result.context("Event synchronizer stopped")
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            tracing::info!("Shutdown signal received");
            Ok(())
        }
    };

    scheduler_handle.abort();
    listener.abort();
    tracing::info!(
        users = cache.user_count(),
        channels = cache.channel_count(),
        "machine stopped"
    );
    outcome
}
