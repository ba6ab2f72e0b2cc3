//! attsync - attendance sync service
//!
//! `attsync serve` (default) runs the HTTP API, the job worker and the
//! scheduler. `attsync sync` runs one pass over the configured devices and
//! exits.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use tokio::signal;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use attsync::db::devices::{get_device, list_devices};
use attsync::device::DeviceTarget;
use attsync::jobs::JobQueue;
use attsync::scheduler::spawn_scheduler;
use attsync::settings::SyncSettings;
use attsync::sync::{sync_all_devices, SqliteHost};
use attsync::{build_router, AppState};
use attsync_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use attsync_common::db::init_database;
use attsync_common::TimeWindow;

const MODULE_NAME: &str = "attsync";

#[derive(Parser, Debug)]
#[command(name = "attsync")]
#[command(about = "Access-control device attendance sync")]
#[command(version)]
struct Args {
    /// Folder holding attsync.db
    #[arg(short, long, global = true, env = "ATTSYNC_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, global = true, env = "ATTSYNC_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(long, global = true)]
    bind: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API, job worker and scheduler
    Serve,
    /// Fetch and process once, then exit
    Sync {
        /// Window start: date or datetime (default: today)
        #[arg(long)]
        start: Option<String>,
        /// Window end: date or datetime (default: today)
        #[arg(long)]
        end: Option<String>,
        /// Only this configured device
        #[arg(long)]
        device: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = RootFolderResolver::new(MODULE_NAME).with_cli_arg(args.root_folder.clone());
    let toml_config = resolver.load_config();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any database work
    info!(
        "Starting attsync v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolver.resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let settings = SyncSettings::resolve(&pool, &toml_config)
        .await
        .context("Failed to resolve sync settings")?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(pool, settings, &toml_config, args.bind, args.port).await,
        Command::Sync { start, end, device } => {
            sync_once(pool, settings, start.as_deref(), end.as_deref(), device).await
        }
    }
}

async fn serve(
    pool: SqlitePool,
    settings: SyncSettings,
    toml_config: &TomlConfig,
    bind: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let last_error = Arc::new(RwLock::new(None));
    let (jobs, worker) = JobQueue::start(pool.clone(), settings.clone(), last_error.clone())
        .await
        .context("Failed to start job worker")?;

    let shutdown = CancellationToken::new();
    let scheduler = spawn_scheduler(pool.clone(), jobs.clone(), settings.clone(), shutdown.clone());

    let state = AppState::new(pool, jobs, settings, last_error);
    let app = build_router(state);

    let bind = bind.unwrap_or_else(|| toml_config.server.bind_address.clone());
    let port = port.unwrap_or(toml_config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    shutdown.cancel();
    if let Err(e) = scheduler.await {
        warn!("Scheduler task ended abnormally: {}", e);
    }
    // The router held the last queue handle; the worker drains what is queued
    if let Err(e) = worker.await {
        warn!("Job worker ended abnormally: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

async fn sync_once(
    pool: SqlitePool,
    settings: SyncSettings,
    start: Option<&str>,
    end: Option<&str>,
    device: Option<i64>,
) -> Result<()> {
    let window = TimeWindow::from_bounds(start, end, settings.utc_offset)?;

    let devices = match device {
        Some(id) => vec![get_device(&pool, id)
            .await?
            .ok_or_else(|| anyhow!("Device {} is not configured", id))?],
        None => list_devices(&pool).await?,
    };

    if devices.is_empty() {
        warn!("No devices configured; nothing to sync");
        return Ok(());
    }

    let host = SqliteHost::new(pool);
    let targets = devices.iter().map(DeviceTarget::from).collect();
    let results = sync_all_devices(&host, targets, &window, &settings).await;

    let mut failures = 0;
    for (device, result) in devices.iter().zip(&results) {
        match result {
            Ok(report) => info!(
                device = %device.name,
                records = report.records_fetched,
                inserted = report.summary.inserted,
                duplicates = report.summary.duplicates,
                unmatched = report.summary.unmatched,
                error = report.device_error.as_deref().unwrap_or_default(),
                "Device synced"
            ),
            Err(e) => {
                failures += 1;
                error!(device = %device.name, error = %e, "Device sync failed");
            }
        }
    }

    if failures > 0 {
        return Err(anyhow!("{} of {} devices failed to sync", failures, devices.len()));
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
